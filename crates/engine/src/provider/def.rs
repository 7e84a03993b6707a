use std::fmt;
use std::sync::Arc;

use std::sync::Weak;

use indexmap::IndexMap;
use orrery_registry::{BranchesVersions, DefaultsRegistry, ProviderMeta, RegistryEntry, TraitRegistry};
use tracing::debug;

use super::instance::RealisedTrait;
use super::{Provider, ProviderClass, TraitInit, TraitInstance};
use crate::capability::{Capabilities, Capability};
use crate::error::{EngineError, LoadFailure, Result};
use crate::value::{Value, ValueKind};

type Loader<P> = Box<dyn Fn(&P) -> std::result::Result<Value, LoadFailure> + Send + Sync>;
type Constructor<P> = Box<dyn Fn(&TraitInit) -> std::result::Result<P, LoadFailure> + Send + Sync>;

/// A declared, lazily loaded attribute.
pub struct AttributeSlot<P> {
	name: &'static str,
	kind: ValueKind,
	optional: bool,
	loader: Loader<P>,
}

impl<P> AttributeSlot<P> {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn kind(&self) -> ValueKind {
		self.kind
	}

	/// Optional attributes may be absent for some objects.
	pub fn is_optional(&self) -> bool {
		self.optional
	}

	pub(super) fn load(&self, provider: &P) -> std::result::Result<Value, LoadFailure> {
		(self.loader)(provider)
	}
}

impl<P> fmt::Debug for AttributeSlot<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttributeSlot")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("optional", &self.optional)
			.finish_non_exhaustive()
	}
}

/// Declaration of a provider class over provider type `P`.
pub struct ProviderDef<P> {
	meta: ProviderMeta,
	unit: Option<String>,
	capabilities: Capabilities,
	constructor: Constructor<P>,
	attributes: IndexMap<&'static str, AttributeSlot<P>>,
	sub_traits: TraitRegistry<dyn ProviderClass>,
}

impl<P> fmt::Debug for ProviderDef<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProviderDef")
			.field("meta", &self.meta)
			.field("unit", &self.unit)
			.field("capabilities", &self.capabilities)
			.field("attributes", &self.attributes.keys().collect::<Vec<_>>())
			.field("sub_traits", &self.sub_traits)
			.finish_non_exhaustive()
	}
}

impl<P: Provider> ProviderDef<P> {
	/// Starts a declaration. `class_id` names the class in diagnostics and
	/// duplicate checks.
	pub fn builder(
		class_id: impl Into<String>,
		trait_type: impl Into<String>,
		constructor: impl Fn(&TraitInit) -> std::result::Result<P, LoadFailure> + Send + Sync + 'static,
	) -> ProviderDefBuilder<P> {
		ProviderDefBuilder {
			class_id: class_id.into(),
			trait_type: trait_type.into(),
			qualifiers: Vec::new(),
			branches: Vec::new(),
			defaults: None,
			unit: None,
			description: String::new(),
			constructor: Box::new(constructor),
			attributes: Vec::new(),
			sub_traits: Vec::new(),
		}
	}

	pub fn attribute(&self, name: &str) -> Option<&AttributeSlot<P>> {
		self.attributes.get(name)
	}

	pub fn attributes(&self) -> impl Iterator<Item = &AttributeSlot<P>> {
		self.attributes.values()
	}
}

impl<P> RegistryEntry for ProviderDef<P> {
	fn meta(&self) -> &ProviderMeta {
		&self.meta
	}
}

impl<P: Provider> ProviderClass for ProviderDef<P> {
	fn unit(&self) -> Option<&str> {
		self.unit.as_deref()
	}

	fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	fn schema(&self) -> IndexMap<&'static str, ValueKind> {
		self.attributes.values().map(|slot| (slot.name, slot.kind)).collect()
	}

	fn sub_traits(&self) -> &TraitRegistry<dyn ProviderClass> {
		&self.sub_traits
	}

	fn instantiate(self: Arc<Self>, init: TraitInit) -> Result<Arc<dyn TraitInstance>> {
		let path = match &init.parent {
			Some(parent) => parent.path().join(init.key.clone()),
			None => init.key.clone().into(),
		};
		let label = format!("{path}@{}", init.object_id);
		let provider =
			(self.constructor)(&init).map_err(|e| e.into_engine(|| format!("constructor of {label}")))?;
		debug!(class = %self.meta.class_id, instance = %label, "provider instantiated");
		Ok(Arc::new_cyclic(|this: &Weak<RealisedTrait<P>>| {
			RealisedTrait::new(self, init, path, provider, label, this.clone())
		}))
	}
}

/// Builder returned by [`ProviderDef::builder`].
pub struct ProviderDefBuilder<P> {
	class_id: String,
	trait_type: String,
	qualifiers: Vec<String>,
	branches: Vec<(String, Vec<String>)>,
	defaults: Option<DefaultsRegistry>,
	unit: Option<String>,
	description: String,
	constructor: Constructor<P>,
	attributes: Vec<AttributeSlot<P>>,
	sub_traits: Vec<Arc<dyn ProviderClass>>,
}

impl<P: Provider> ProviderDefBuilder<P> {
	pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
		self.qualifiers.push(qualifier.into());
		self
	}

	/// Declares a branch and its versions. The first branch declared, and the
	/// first version of each branch, become the defaults unless
	/// [`defaults`](Self::defaults) is given.
	pub fn branch<I, S>(mut self, branch: impl Into<String>, versions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.branches
			.push((branch.into(), versions.into_iter().map(Into::into).collect()));
		self
	}

	pub fn defaults(mut self, defaults: DefaultsRegistry) -> Self {
		self.defaults = Some(defaults);
		self
	}

	pub fn unit(mut self, unit: impl Into<String>) -> Self {
		self.unit = Some(unit.into());
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn attribute(
		self,
		name: &'static str,
		kind: ValueKind,
		loader: impl Fn(&P) -> std::result::Result<Value, LoadFailure> + Send + Sync + 'static,
	) -> Self {
		self.slot(name, kind, false, Box::new(loader))
	}

	/// Declares an attribute whose data may be missing for some objects.
	pub fn optional_attribute(
		self,
		name: &'static str,
		kind: ValueKind,
		loader: impl Fn(&P) -> std::result::Result<Value, LoadFailure> + Send + Sync + 'static,
	) -> Self {
		self.slot(name, kind, true, Box::new(loader))
	}

	/// Declares a class reachable one level below this one.
	pub fn sub_trait(mut self, class: Arc<dyn ProviderClass>) -> Self {
		self.sub_traits.push(class);
		self
	}

	fn slot(mut self, name: &'static str, kind: ValueKind, optional: bool, loader: Loader<P>) -> Self {
		self.attributes.push(AttributeSlot {
			name,
			kind,
			optional,
			loader,
		});
		self
	}

	/// Validates the declaration.
	pub fn build(self) -> Result<ProviderDef<P>> {
		let mut meta = ProviderMeta::new(self.class_id, &self.trait_type)?.with_description(self.description);
		for qualifier in &self.qualifiers {
			meta = meta.with_qualifier(qualifier)?;
		}
		if !self.branches.is_empty() {
			let mut branches = BranchesVersions::new();
			for (branch, versions) in &self.branches {
				branches = branches.with_branch(branch, versions.iter().map(String::as_str))?;
			}
			meta = meta.with_branches_versions(branches);
		}
		if let Some(defaults) = self.defaults {
			meta = meta.with_defaults(defaults);
		}

		let mut sub_traits = TraitRegistry::builder("sub_traits");
		sub_traits.register_all(self.sub_traits)?;

		let mut attributes = IndexMap::with_capacity(self.attributes.len());
		for slot in self.attributes {
			if attributes.contains_key(slot.name) {
				return Err(EngineError::DuplicateAttribute {
					provider: meta.class_id.clone(),
					attribute: slot.name.to_string(),
				});
			}
			attributes.insert(slot.name, slot);
		}

		let capabilities = [
			attributes
				.get("value")
				.is_some_and(|slot: &AttributeSlot<P>| matches!(slot.kind, ValueKind::Array { .. }))
				.then_some(Capability::Shape),
			self.unit.is_some().then_some(Capability::Unit),
			attributes.contains_key("variance").then_some(Capability::Variance),
		]
		.into_iter()
		.flatten()
		.collect();

		Ok(ProviderDef {
			meta,
			unit: self.unit,
			capabilities,
			constructor: self.constructor,
			attributes,
			sub_traits: sub_traits.build(),
		})
	}
}
