use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use orrery_key::{KeyPath, TraitKey};
use orrery_registry::RegistryEntry;
use tracing::{debug, trace};

use super::def::ProviderDef;
use super::{Provider, ProviderClass, TraitInit, TraitInstance};
use crate::capability::{Capabilities, HasShape, HasUnit, HasVariance};
use crate::column::ColumnStore;
use crate::error::{EngineError, Result};
use crate::lifecycle::{Lifecycle, ResourceGuard};
use crate::pool::InstancePool;
use crate::slots::SlotCache;
use crate::value::{Value, ValueKind};

/// Sub-traits pooled per realised provider.
const SUB_TRAIT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(19);

/// A provider of type `P` realised for one object and one concrete key.
pub struct RealisedTrait<P: Provider> {
	def: Arc<ProviderDef<P>>,
	key: TraitKey,
	path: KeyPath,
	object_id: String,
	columns: Arc<ColumnStore>,
	provider: P,
	lifecycle: Lifecycle,
	slots: SlotCache,
	sub_traits: InstancePool<TraitKey>,
	this: Weak<RealisedTrait<P>>,
}

impl<P: Provider> fmt::Debug for RealisedTrait<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RealisedTrait")
			.field("path", &self.path)
			.field("object_id", &self.object_id)
			.field("lifecycle", &self.lifecycle)
			.field("loaded", &self.slots.loaded())
			.finish_non_exhaustive()
	}
}

impl<P: Provider> RealisedTrait<P> {
	pub(super) fn new(
		def: Arc<ProviderDef<P>>,
		init: TraitInit,
		path: KeyPath,
		provider: P,
		label: String,
		this: Weak<Self>,
	) -> Self {
		Self {
			def,
			key: init.key,
			path,
			object_id: init.object_id,
			columns: init.columns,
			provider,
			lifecycle: Lifecycle::new(label),
			slots: SlotCache::new(),
			sub_traits: InstancePool::new(SUB_TRAIT_CAPACITY),
			this,
		}
	}

	/// The typed provider.
	pub fn provider(&self) -> &P {
		&self.provider
	}

	/// Runs `body` against the provider with its resource held open.
	pub fn scoped<R>(&self, body: impl FnOnce(&P) -> Result<R>) -> Result<R> {
		self.lifecycle.scoped(&self.provider, || body(&self.provider))
	}

	fn label(&self) -> &str {
		self.lifecycle.label()
	}
}

impl<P: Provider> TraitInstance for RealisedTrait<P> {
	fn key(&self) -> &TraitKey {
		&self.key
	}

	fn path(&self) -> &KeyPath {
		&self.path
	}

	fn object_id(&self) -> &str {
		&self.object_id
	}

	fn class_id(&self) -> &str {
		self.def.class_id()
	}

	fn attribute_names(&self) -> Vec<&'static str> {
		self.def.attributes().map(|slot| slot.name()).collect()
	}

	fn value_kind(&self, attribute: &str) -> Option<ValueKind> {
		self.def.attribute(attribute).map(|slot| slot.kind())
	}

	fn get(&self, attribute: &str) -> Result<Value> {
		let slot = self.def.attribute(attribute).ok_or_else(|| EngineError::UnknownAttribute {
			provider: self.label().to_string(),
			attribute: attribute.to_string(),
		})?;
		if let Some(value) = self.slots.cached(slot.name()) {
			trace!(instance = %self.label(), attribute, "attribute cached");
			return Ok(value);
		}
		self.slots.get_or_load(slot.name(), || {
			self.lifecycle.scoped(&self.provider, || {
				debug!(instance = %self.label(), attribute, "loading attribute");
				let value = slot
					.load(&self.provider)
					.map_err(|e| e.into_engine(|| format!("loader of {}.{attribute}", self.label())))?;
				if !value.matches_kind(slot.kind()) {
					return Err(EngineError::TypeMismatch {
						attribute: attribute.to_string(),
						expected: slot.kind(),
						found: value.type_name(),
					});
				}
				Ok(value)
			})
		})
	}

	fn is_cached(&self, attribute: &str) -> bool {
		self.slots.is_cached(attribute)
	}

	fn sub_trait(&self, key: &TraitKey) -> Result<Arc<dyn TraitInstance>> {
		let (key, class) = self.def.sub_traits().resolve_nested(key)?;
		self.sub_traits.get_or_build(key.clone(), || {
			let parent: Arc<dyn TraitInstance> = self
				.this
				.upgrade()
				.ok_or_else(|| EngineError::not_available(format!("parent of {key} in {}", self.label())))?;
			let init = TraitInit {
				key,
				object_id: self.object_id.clone(),
				columns: Arc::clone(&self.columns),
				parent: Some(parent),
			};
			Arc::clone(class).instantiate(init)
		})
	}

	fn realise(&self) -> Result<()> {
		self.lifecycle.scoped(&self.provider, || {
			for slot in self.def.attributes() {
				match self.get(slot.name()) {
					Ok(_) => {}
					Err(err) if slot.is_optional() && err.is_not_available() => {
						debug!(instance = %self.label(), attribute = slot.name(), "optional attribute absent");
					}
					Err(err) => return Err(err),
				}
			}
			Ok(())
		})
	}

	fn guard(&self) -> Result<ResourceGuard<'_>> {
		self.lifecycle.guard(&self.provider)
	}

	fn acquire(&self) -> Result<()> {
		self.lifecycle.acquire(&self.provider)
	}

	fn release(&self) -> Result<()> {
		self.lifecycle.release(&self.provider)
	}

	fn open_count(&self) -> usize {
		self.lifecycle.open_count()
	}

	fn unit(&self) -> Option<&str> {
		self.def.unit()
	}

	fn capabilities(&self) -> Capabilities {
		self.def.capabilities()
	}

	fn as_shape(&self) -> Option<&dyn HasShape> {
		self.capabilities().contains(Capabilities::SHAPE).then_some(self as &dyn HasShape)
	}

	fn as_unit(&self) -> Option<&dyn HasUnit> {
		self.capabilities().contains(Capabilities::UNIT).then_some(self as &dyn HasUnit)
	}

	fn as_variance(&self) -> Option<&dyn HasVariance> {
		self.capabilities()
			.contains(Capabilities::VARIANCE)
			.then_some(self as &dyn HasVariance)
	}
}

impl<P: Provider> HasShape for RealisedTrait<P> {
	fn shape(&self) -> Result<Vec<usize>> {
		match self.get("value")? {
			Value::Array(array) => Ok(array.shape().to_vec()),
			other => Err(EngineError::TypeMismatch {
				attribute: "value".to_string(),
				expected: self.value_kind("value").unwrap_or(other.kind()),
				found: other.type_name(),
			}),
		}
	}
}

impl<P: Provider> HasUnit for RealisedTrait<P> {
	fn unit(&self) -> &str {
		self.def.unit().unwrap_or_default()
	}
}

impl<P: Provider> HasVariance for RealisedTrait<P> {
	fn variance(&self) -> Result<Value> {
		self.get("variance")
	}
}
