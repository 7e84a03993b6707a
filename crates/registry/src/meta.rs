use orrery_key::{KeyField, TraitName};

use crate::branches::BranchesVersions;
use crate::defaults::DefaultsRegistry;
use crate::error::Result;

/// Declaration metadata of a provider class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMeta {
	/// Identifies the provider class. Registering the same concrete key twice
	/// under one id is a no-op.
	pub class_id: String,
	pub trait_type: String,
	/// Allowed qualifiers. Empty means the provider is unqualified, which
	/// makes every key it declares a pattern.
	pub qualifiers: Vec<String>,
	pub branches_versions: Option<BranchesVersions>,
	/// Explicit defaults. When absent they are derived from
	/// `branches_versions` declaration order.
	pub defaults: Option<DefaultsRegistry>,
	pub description: String,
}

impl ProviderMeta {
	pub fn new(class_id: impl Into<String>, trait_type: &str) -> Result<Self> {
		KeyField::Type.validate(trait_type)?;
		Ok(Self {
			class_id: class_id.into(),
			trait_type: trait_type.to_string(),
			qualifiers: Vec::new(),
			branches_versions: None,
			defaults: None,
			description: String::new(),
		})
	}

	pub fn with_qualifier(mut self, qualifier: &str) -> Result<Self> {
		KeyField::Qualifier.validate(qualifier)?;
		self.qualifiers.push(qualifier.to_string());
		Ok(self)
	}

	pub fn with_branches_versions(mut self, branches_versions: BranchesVersions) -> Self {
		self.branches_versions = Some(branches_versions);
		self
	}

	pub fn with_defaults(mut self, defaults: DefaultsRegistry) -> Self {
		self.defaults = Some(defaults);
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	/// Key-names this provider declares, one per qualifier.
	pub fn names(&self) -> Result<Vec<TraitName>> {
		if self.qualifiers.is_empty() {
			return Ok(vec![TraitName::new(&self.trait_type, None)?]);
		}
		self.qualifiers
			.iter()
			.map(|q| -> Result<TraitName> { Ok(TraitName::new(&self.trait_type, Some(q))?) })
			.collect()
	}

	/// Defaults this provider contributes, explicit or derived.
	pub fn effective_defaults(&self) -> Option<DefaultsRegistry> {
		self.defaults
			.clone()
			.or_else(|| self.branches_versions.as_ref().map(BranchesVersions::defaults))
	}
}

/// Trait for accessing declaration metadata from provider classes.
pub trait RegistryEntry {
	/// Returns the metadata struct for this provider class.
	fn meta(&self) -> &ProviderMeta;

	fn class_id(&self) -> &str {
		&self.meta().class_id
	}

	fn trait_type(&self) -> &str {
		&self.meta().trait_type
	}

	fn qualifiers(&self) -> &[String] {
		&self.meta().qualifiers
	}

	fn branches_versions(&self) -> Option<&BranchesVersions> {
		self.meta().branches_versions.as_ref()
	}

	fn description(&self) -> &str {
		&self.meta().description
	}
}

impl RegistryEntry for ProviderMeta {
	fn meta(&self) -> &ProviderMeta {
		self
	}
}
