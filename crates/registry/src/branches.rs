use indexmap::IndexMap;
use orrery_key::{KeyField, TraitKey, TraitName};

use crate::defaults::DefaultsRegistry;
use crate::error::Result;

/// Ordered `branch -> [versions]` declaration of a provider.
///
/// Declaration order carries meaning: the first branch is the default branch
/// and the first version listed under a branch is that branch's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchesVersions {
	branches: IndexMap<String, Vec<String>>,
}

impl BranchesVersions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a branch with its versions, validating every name.
	pub fn with_branch<'a>(mut self, branch: &str, versions: impl IntoIterator<Item = &'a str>) -> Result<Self> {
		KeyField::Branch.validate(branch)?;
		let versions = versions
			.into_iter()
			.map(|version| -> Result<String> {
				KeyField::Version.validate(version)?;
				Ok(version.to_string())
			})
			.collect::<Result<Vec<_>>>()?;
		self.branches.entry(branch.to_string()).or_default().extend(versions);
		Ok(self)
	}

	pub fn is_empty(&self) -> bool {
		self.branches.values().all(Vec::is_empty)
	}

	pub fn branches(&self) -> impl Iterator<Item = &str> {
		self.branches.keys().map(String::as_str)
	}

	pub fn versions(&self, branch: &str) -> &[String] {
		self.branches.get(branch).map(Vec::as_slice).unwrap_or_default()
	}

	/// Iterates over every `(branch, version)` pair in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.branches
			.iter()
			.flat_map(|(branch, versions)| versions.iter().map(move |v| (branch.as_str(), v.as_str())))
	}

	/// Derives defaults from declaration order.
	pub fn defaults(&self) -> DefaultsRegistry {
		let mut defaults = DefaultsRegistry::new();
		for (branch, versions) in &self.branches {
			let Some(first) = versions.first() else { continue };
			// Fresh record, so no setter can conflict.
			let _ = defaults.set_default_version(branch, first, false);
			if defaults.default_branch().is_none() {
				let _ = defaults.set_default_branch(branch, false);
			}
		}
		defaults
	}

	pub fn has_single_branch_and_version(&self) -> bool {
		self.iter().count() == 1
	}

	/// The concrete keys this declaration yields for one key-name.
	pub fn keys_for(&self, name: &TraitName) -> Result<Vec<TraitKey>> {
		self.iter()
			.map(|(branch, version)| -> Result<TraitKey> { Ok(name.key(Some(branch), Some(version))?) })
			.collect()
	}
}
