//! Default branch and version records.
//!
//! # Role
//!
//! A [`DefaultsRegistry`] holds, for one key-name, the default branch and a
//! default version per branch. A [`DefaultsTable`] maps every key-name to its
//! record and is what key completion consults.
//!
//! # Invariants
//!
//! - A default, once set, only changes when the caller passes `override`.
//!   Setting the value it already has is a no-op; any other value fails with
//!   [`RegistryError::DefaultConflict`].

use indexmap::IndexMap;
use orrery_key::TraitName;
use rustc_hash::FxHashMap;

use crate::error::{RegistryError, Result};


/// Default branch and per-branch default versions for one key-name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultsRegistry {
	default_branch: Option<String>,
	versions: IndexMap<String, String>,
}

impl DefaultsRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn default_branch(&self) -> Option<&str> {
		self.default_branch.as_deref()
	}

	/// Returns the default version recorded for `branch`.
	pub fn version_for(&self, branch: &str) -> Option<&str> {
		self.versions.get(branch).map(String::as_str)
	}

	/// Branches with a recorded default version, in insertion order.
	pub fn branches(&self) -> impl Iterator<Item = &str> {
		self.versions.keys().map(String::as_str)
	}

	pub fn set_default_branch(&mut self, branch: &str, override_existing: bool) -> Result<()> {
		match &self.default_branch {
			Some(existing) if existing != branch && !override_existing => Err(RegistryError::DefaultConflict {
				scope: "default branch".to_string(),
				existing: existing.clone(),
				new: branch.to_string(),
			}),
			_ => {
				self.default_branch = Some(branch.to_string());
				Ok(())
			}
		}
	}

	pub fn set_default_version(&mut self, branch: &str, version: &str, override_existing: bool) -> Result<()> {
		match self.versions.get(branch) {
			Some(existing) if existing != version && !override_existing => Err(RegistryError::DefaultConflict {
				scope: format!("default version for branch {branch:?}"),
				existing: existing.clone(),
				new: version.to_string(),
			}),
			_ => {
				self.versions.insert(branch.to_string(), version.to_string());
				Ok(())
			}
		}
	}

	/// Folds `other` into `self` under the same conflict rules as the setters.
	///
	/// Nothing is modified if any conflict is found.
	pub fn merge(&mut self, other: &DefaultsRegistry, override_existing: bool) -> Result<()> {
		let mut merged = self.clone();
		if let Some(branch) = &other.default_branch {
			merged.set_default_branch(branch, override_existing)?;
		}
		for (branch, version) in &other.versions {
			merged.set_default_version(branch, version, override_existing)?;
		}
		*self = merged;
		Ok(())
	}
}

/// Defaults for every key-name known to a registry.
#[derive(Debug, Clone, Default)]
pub struct DefaultsTable {
	records: FxHashMap<TraitName, DefaultsRegistry>,
}

impl DefaultsTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, name: &TraitName) -> Option<&DefaultsRegistry> {
		self.records.get(name)
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn set_default_branch(&mut self, name: &TraitName, branch: &str, override_existing: bool) -> Result<()> {
		self.records
			.entry(name.clone())
			.or_default()
			.set_default_branch(branch, override_existing)
			.map_err(|e| e.in_scope(name))
	}

	pub fn set_default_version(
		&mut self,
		name: &TraitName,
		branch: &str,
		version: &str,
		override_existing: bool,
	) -> Result<()> {
		self.records
			.entry(name.clone())
			.or_default()
			.set_default_version(branch, version, override_existing)
			.map_err(|e| e.in_scope(name))
	}

	/// Merges `defaults` into the record for `name`, creating it if needed.
	pub fn merge(&mut self, name: &TraitName, defaults: &DefaultsRegistry, override_existing: bool) -> Result<()> {
		self.records
			.entry(name.clone())
			.or_default()
			.merge(defaults, override_existing)
			.map_err(|e| e.in_scope(name))
	}
}
