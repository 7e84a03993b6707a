//! Provider classes and their realised instances.
//!
//! # Role
//!
//! A provider class is declared once with [`ProviderDef::builder`]: the keys
//! it serves, a constructor, and a table of attribute slots, each with a
//! value kind and a loader. The registry maps keys to classes; a class is
//! instantiated per `(object, key)` into a [`TraitInstance`].
//!
//! A class may declare sub-trait classes with their own registry. A realised
//! provider resolves and pools its sub-traits per key, each sub-trait seeing
//! the provider above it as its parent.
//!
//! # Invariants
//!
//! - Attribute names are unique within a class.
//! - Every loader call runs inside a scoped acquisition of the instance's
//!   resource, so a loader may rely on `preload` having run.
//! - A loaded value always matches its slot's declared [`ValueKind`].

mod def;
mod instance;

use std::sync::Arc;

use indexmap::IndexMap;
use orrery_key::{KeyPath, TraitKey};
use orrery_registry::{RegistryEntry, TraitRegistry};

pub use self::def::{AttributeSlot, ProviderDef, ProviderDefBuilder};
pub use self::instance::RealisedTrait;
use crate::capability::{Capabilities, HasShape, HasUnit, HasVariance};
use crate::column::ColumnStore;
use crate::error::{LoadFailure, Result};
use crate::lifecycle::ResourceGuard;
use crate::value::{Value, ValueKind};


/// Resource hooks of a provider. Both default to no-ops.
pub trait Provider: Send + Sync + 'static {
	/// Opens the underlying resource. Runs when the first reader arrives.
	fn preload(&self) -> std::result::Result<(), LoadFailure> {
		Ok(())
	}

	/// Closes the underlying resource. Runs when the last reader leaves.
	fn cleanup(&self) -> std::result::Result<(), LoadFailure> {
		Ok(())
	}
}

/// What a provider constructor receives.
#[derive(Debug, Clone)]
pub struct TraitInit {
	/// The concrete key the instance serves.
	pub key: TraitKey,
	pub object_id: String,
	pub columns: Arc<ColumnStore>,
	/// The provider a sub-trait hangs off. Storing it inside the provider
	/// keeps the parent alive for as long as the sub-trait lives.
	pub parent: Option<Arc<dyn TraitInstance>>,
}

/// A registered provider class, with its concrete provider type erased.
pub trait ProviderClass: RegistryEntry + Send + Sync {
	fn unit(&self) -> Option<&str>;

	fn capabilities(&self) -> Capabilities;

	/// Attribute name to declared kind, in declaration order.
	fn schema(&self) -> IndexMap<&'static str, ValueKind>;

	/// Classes reachable one level below this one.
	fn sub_traits(&self) -> &TraitRegistry<dyn ProviderClass>;

	fn instantiate(self: Arc<Self>, init: TraitInit) -> Result<Arc<dyn TraitInstance>>;
}

/// A provider bound to one concrete key and one object.
pub trait TraitInstance: Send + Sync {
	fn key(&self) -> &TraitKey;

	/// Keys from the top-level provider down to this one.
	fn path(&self) -> &KeyPath;

	fn object_id(&self) -> &str;

	fn class_id(&self) -> &str;

	fn attribute_names(&self) -> Vec<&'static str>;

	/// Declared kind of `attribute`, if the class has it.
	fn value_kind(&self, attribute: &str) -> Option<ValueKind>;

	/// Returns the attribute, loading it on first read.
	fn get(&self, attribute: &str) -> Result<Value>;

	fn is_cached(&self, attribute: &str) -> bool;

	/// Resolves `key` among the class's sub-traits and returns the sub-trait
	/// realised for the same object, building it on first use.
	fn sub_trait(&self, key: &TraitKey) -> Result<Arc<dyn TraitInstance>>;

	/// Loads every attribute under a single acquisition. Optional attributes
	/// whose data is absent are skipped.
	fn realise(&self) -> Result<()>;

	/// Takes a reference on the resource until the guard drops.
	fn guard(&self) -> Result<ResourceGuard<'_>>;

	fn acquire(&self) -> Result<()>;

	fn release(&self) -> Result<()>;

	fn open_count(&self) -> usize;

	fn unit(&self) -> Option<&str>;

	fn capabilities(&self) -> Capabilities;

	fn as_shape(&self) -> Option<&dyn HasShape>;

	fn as_unit(&self) -> Option<&dyn HasUnit>;

	fn as_variance(&self) -> Option<&dyn HasVariance>;
}

impl std::fmt::Debug for dyn TraitInstance {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TraitInstance")
			.field("path", &self.path().to_string())
			.field("object_id", &self.object_id())
			.field("open_count", &self.open_count())
			.finish()
	}
}
