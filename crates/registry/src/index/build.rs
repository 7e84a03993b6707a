use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use orrery_key::{TraitKey, TraitName};
use rustc_hash::FxBuildHasher;
use tracing::debug;

use super::TraitRegistry;
use crate::defaults::DefaultsTable;
use crate::error::{RegistryError, Result};
use crate::meta::RegistryEntry;

/// Builder for constructing a [`TraitRegistry`].
///
/// Each [`register`](Self::register) call expands the class's declaration into
/// keys and inserts them immediately, so conflicts fail at registration time.
pub struct RegistryBuilder<T: ?Sized> {
	label: &'static str,
	concrete: IndexMap<TraitKey, Arc<T>, FxBuildHasher>,
	legacy: IndexMap<TraitKey, Arc<T>, FxBuildHasher>,
	classes: Vec<Arc<T>>,
	defaults: DefaultsTable,
}

impl<T: ?Sized> std::fmt::Debug for RegistryBuilder<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegistryBuilder")
			.field("label", &self.label)
			.field("concrete", &self.concrete.len())
			.field("legacy", &self.legacy.len())
			.field("classes", &self.classes.len())
			.finish()
	}
}

impl<T: RegistryEntry + ?Sized> RegistryBuilder<T> {
	/// Creates a new builder with the given label for error messages.
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			concrete: IndexMap::default(),
			legacy: IndexMap::default(),
			classes: Vec::new(),
			defaults: DefaultsTable::new(),
		}
	}

	/// Returns the number of keys registered so far.
	pub fn len(&self) -> usize {
		self.concrete.len() + self.legacy.len()
	}

	/// Returns true if no keys have been registered so far.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Registers a provider class under every key its declaration expands to.
	///
	/// The expansion is `qualifiers x branches x versions`. The class's
	/// defaults are merged into the defaults table.
	///
	/// # Errors
	///
	/// - [`RegistryError::DuplicateRegistration`] if a key already maps to a
	///   class with a different id. The same class id is a no-op.
	/// - [`RegistryError::DefaultConflict`] if the class's defaults disagree
	///   with defaults already recorded for one of its key-names.
	pub fn register(&mut self, class: Arc<T>) -> Result<&mut Self> {
		let meta = class.meta();
		let names = meta.names()?;
		let mut keys = Vec::new();
		for name in &names {
			match meta.branches_versions.as_ref().filter(|bv| !bv.is_empty()) {
				Some(bv) => keys.extend(bv.keys_for(name)?),
				None => keys.push(name.key(None, None)?),
			}
		}

		for key in &keys {
			let table = if key.is_concrete() { &self.concrete } else { &self.legacy };
			if let Some(existing) = table.get(key)
				&& existing.class_id() != class.class_id()
			{
				return Err(RegistryError::DuplicateRegistration {
					registry: self.label,
					key: key.clone(),
					existing: existing.class_id().to_string(),
					new: class.class_id().to_string(),
				});
			}
		}

		if let Some(defaults) = meta.effective_defaults() {
			let mut staged = self.defaults.clone();
			for name in &names {
				staged.merge(name, &defaults, false)?;
			}
			self.defaults = staged;
		}

		let mut inserted = 0usize;
		for key in keys {
			let table = if key.is_concrete() { &mut self.concrete } else { &mut self.legacy };
			if let Entry::Vacant(slot) = table.entry(key) {
				slot.insert(Arc::clone(&class));
				inserted += 1;
			}
		}
		debug!(
			registry = self.label,
			class = class.class_id(),
			trait_type = class.trait_type(),
			inserted,
			"registered provider"
		);
		if !self.classes.iter().any(|c| c.class_id() == class.class_id()) {
			self.classes.push(class);
		}
		Ok(self)
	}

	/// Registers each class in order, stopping at the first error.
	pub fn register_all<I: IntoIterator<Item = Arc<T>>>(&mut self, classes: I) -> Result<&mut Self> {
		for class in classes {
			self.register(class)?;
		}
		Ok(self)
	}

	/// Sets the default branch for a key-name outside any class declaration.
	pub fn set_default_branch(&mut self, name: &TraitName, branch: &str, override_existing: bool) -> Result<&mut Self> {
		self.defaults.set_default_branch(name, branch, override_existing)?;
		Ok(self)
	}

	/// Sets the default version of a branch outside any class declaration.
	pub fn set_default_version(
		&mut self,
		name: &TraitName,
		branch: &str,
		version: &str,
		override_existing: bool,
	) -> Result<&mut Self> {
		self.defaults.set_default_version(name, branch, version, override_existing)?;
		Ok(self)
	}

	/// Freezes the builder into an immutable registry.
	pub fn build(self) -> TraitRegistry<T> {
		debug!(
			registry = self.label,
			concrete = self.concrete.len(),
			legacy = self.legacy.len(),
			classes = self.classes.len(),
			"registry built"
		);
		TraitRegistry {
			label: self.label,
			concrete: self.concrete,
			legacy: self.legacy,
			classes: self.classes,
			defaults: self.defaults,
		}
	}
}
