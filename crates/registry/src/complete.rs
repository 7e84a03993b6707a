//! Filling in a pattern key's branch and version from recorded defaults.

use orrery_key::{KeyField, TraitKey};

use crate::defaults::DefaultsTable;
use crate::error::{RegistryError, Result};


/// Completes `pattern` into a concrete key.
///
/// Type and qualifier are never defaulted. A missing branch is taken from the
/// key-name's default branch, then a missing version from that branch's
/// default version. Already-concrete keys are returned unchanged, so
/// completion is idempotent.
///
/// # Errors
///
/// - [`RegistryError::AmbiguousKey`] if type or qualifier is unset.
/// - [`RegistryError::UnknownKeyName`] if a branch is needed and the
///   key-name has no defaults.
/// - [`RegistryError::UnknownBranch`] if a version is needed and the branch
///   has no default version.
pub fn complete(pattern: &TraitKey, defaults: &DefaultsTable) -> Result<TraitKey> {
	for field in [KeyField::Type, KeyField::Qualifier] {
		if pattern.field(field).is_none() {
			return Err(RegistryError::AmbiguousKey {
				key: pattern.clone(),
				missing: field,
			});
		}
	}
	if pattern.is_concrete() {
		return Ok(pattern.clone());
	}

	let Some(name) = pattern.name() else {
		return Err(RegistryError::AmbiguousKey {
			key: pattern.clone(),
			missing: KeyField::Type,
		});
	};
	let record = defaults.get(&name);
	let unknown_name = || RegistryError::UnknownKeyName { name: name.to_string() };

	let branch = match pattern.branch() {
		Some(branch) => branch,
		None => record.and_then(|r| r.default_branch()).ok_or_else(unknown_name)?,
	};
	let version = match pattern.version() {
		Some(version) => version,
		None => record
			.ok_or_else(unknown_name)?
			.version_for(branch)
			.ok_or_else(|| RegistryError::UnknownBranch {
				name: name.to_string(),
				branch: branch.to_string(),
			})?,
	};

	Ok(pattern
		.with_field_replaced(KeyField::Branch, Some(branch))?
		.with_field_replaced(KeyField::Version, Some(version))?)
}
