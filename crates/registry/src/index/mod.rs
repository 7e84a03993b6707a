//! Key-to-provider index.
//!
//! # Role
//!
//! Maps every concrete key to the provider class that serves it. Built once by
//! [`RegistryBuilder`], then read-only.
//!
//! # Invariants
//!
//! - Registration completes before the first lookup. The built registry has
//!   no interior mutability, so concurrent lookups need no locking.
//! - Each concrete key maps to exactly one provider class.
//! - Keys with unset fields (from unqualified providers or providers without
//!   branches) live in a separate legacy table that only
//!   [`TraitRegistry::retrieve_with_fallback`] consults.

mod build;
mod lookup;

use std::sync::Arc;

use indexmap::IndexMap;
use orrery_key::TraitKey;
use rustc_hash::FxBuildHasher;

pub use self::build::RegistryBuilder;
use crate::defaults::DefaultsTable;


/// Immutable map from keys to provider classes.
pub struct TraitRegistry<T: ?Sized> {
	label: &'static str,
	concrete: IndexMap<TraitKey, Arc<T>, FxBuildHasher>,
	legacy: IndexMap<TraitKey, Arc<T>, FxBuildHasher>,
	classes: Vec<Arc<T>>,
	defaults: DefaultsTable,
}

impl<T: ?Sized> std::fmt::Debug for TraitRegistry<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TraitRegistry")
			.field("label", &self.label)
			.field("concrete", &self.concrete.len())
			.field("legacy", &self.legacy.len())
			.field("classes", &self.classes.len())
			.finish()
	}
}
