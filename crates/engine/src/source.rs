//! The explicit context object every read goes through.
//!
//! # Role
//!
//! A [`DataSource`] owns the provider registry, the column store, the cache
//! chain and the pool of realised providers. Independent sources share
//! nothing, so tests and hosts can run several side by side.
//!
//! # Invariants
//!
//! - Registration happens on [`DataSourceBuilder`], once, before the first
//!   read. The built source never mutates its registry.
//! - At most one realised provider per `(object, concrete key)` is live. The
//!   pool is bounded by [`EngineConfig::trait_cache_capacity`].
//! - Cache requests are addressed by the completed key path, so a pattern and
//!   its completion share cache entries.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use orrery_key::{ColumnId, KeyPath, TraitKey, TraitName};
use orrery_registry::{RegistryBuilder, TraitRegistry};
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::cache::{CacheChain, CacheLayer, CacheRequest, MemoryCache};
use crate::column::{Column, ColumnStore};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pool::InstancePool;
use crate::provider::{ProviderClass, TraitInit, TraitInstance};
use crate::value::{Value, ValueKind};

#[cfg(test)]
mod tests;

/// Name of the memory layer added by [`DataSourceBuilder::memory_cache`].
pub const MEMORY_LAYER: &str = "memory";

type InstanceKey = (String, TraitKey);

/// Attribute schema grouped by key-name.
pub type Schema = IndexMap<TraitName, TraitSchema>;

/// Attributes of every provider class registered under one key-name, and the
/// schema of their sub-traits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitSchema {
	pub attributes: IndexMap<&'static str, ValueKind>,
	pub sub_traits: Schema,
}

impl TraitSchema {
	fn merge(&mut self, other: TraitSchema) {
		self.attributes.extend(other.attributes);
		for (name, schema) in other.sub_traits {
			self.sub_traits.entry(name).or_default().merge(schema);
		}
	}
}

fn registry_schema(registry: &TraitRegistry<dyn ProviderClass>, include_sub_traits: bool) -> Result<Schema> {
	let mut schema = Schema::new();
	for class in registry.classes() {
		let mut node = TraitSchema {
			attributes: class.schema(),
			sub_traits: Schema::new(),
		};
		if include_sub_traits {
			node.sub_traits = registry_schema(class.sub_traits(), true)?;
		}
		for name in class.meta().names()? {
			schema.entry(name).or_default().merge(node.clone());
		}
	}
	Ok(schema)
}

pub struct DataSourceBuilder {
	registry: RegistryBuilder<dyn ProviderClass>,
	columns: ColumnStore,
	layers: Vec<Arc<dyn CacheLayer>>,
	memory_cache: bool,
	objects: IndexSet<String, FxBuildHasher>,
	config: EngineConfig,
}

impl DataSourceBuilder {
	fn new() -> Self {
		Self {
			registry: RegistryBuilder::new("providers"),
			columns: ColumnStore::new(),
			layers: Vec::new(),
			memory_cache: false,
			objects: IndexSet::default(),
			config: EngineConfig::default(),
		}
	}

	/// Registers a provider class.
	pub fn provider(&mut self, class: Arc<dyn ProviderClass>) -> Result<&mut Self> {
		self.registry.register(class)?;
		Ok(self)
	}

	pub fn column(&mut self, column: Arc<dyn Column>) -> Result<&mut Self> {
		self.columns.insert(column)?;
		Ok(self)
	}

	/// Registers a column declared with a short `kind:name` id under `source`.
	pub fn associate_column(&mut self, source: &str, column: Arc<dyn Column>) -> Result<&mut Self> {
		self.columns.associate(source, column)?;
		Ok(self)
	}

	/// Declares object ids. A source with no declared objects accepts any id.
	pub fn objects<I, S>(&mut self, ids: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.objects.extend(ids.into_iter().map(Into::into));
		self
	}

	/// Appends a cache layer behind those already added.
	pub fn cache_layer(&mut self, layer: Arc<dyn CacheLayer>) -> &mut Self {
		self.layers.push(layer);
		self
	}

	/// Puts a writable in-memory layer in front of every other layer, sized by
	/// [`EngineConfig::memory_cache_capacity`].
	pub fn memory_cache(&mut self) -> &mut Self {
		self.memory_cache = true;
		self
	}

	pub fn config(&mut self, config: EngineConfig) -> &mut Self {
		self.config = config;
		self
	}

	pub fn set_default_branch(&mut self, name: &TraitName, branch: &str, override_existing: bool) -> Result<&mut Self> {
		self.registry.set_default_branch(name, branch, override_existing)?;
		Ok(self)
	}

	pub fn set_default_version(
		&mut self,
		name: &TraitName,
		branch: &str,
		version: &str,
		override_existing: bool,
	) -> Result<&mut Self> {
		self.registry
			.set_default_version(name, branch, version, override_existing)?;
		Ok(self)
	}

	pub fn build(self) -> Result<DataSource> {
		self.config.validate()?;
		let capacity = self.config.trait_cache_capacity()?;

		let mut chain = CacheChain::new();
		if self.memory_cache {
			let bound = self.config.memory_cache_capacity.and_then(NonZeroUsize::new);
			chain.push(Arc::new(MemoryCache::new(MEMORY_LAYER, bound)));
		}
		for layer in self.layers {
			chain.push(layer);
		}

		let registry = self.registry.build();
		debug!(
			providers = registry.classes().len(),
			keys = registry.len(),
			columns = self.columns.len(),
			layers = chain.len(),
			"data source built"
		);
		Ok(DataSource {
			registry,
			columns: Arc::new(self.columns),
			chain,
			objects: self.objects,
			instances: InstancePool::new(capacity),
			config: self.config,
		})
	}
}

pub struct DataSource {
	registry: TraitRegistry<dyn ProviderClass>,
	columns: Arc<ColumnStore>,
	chain: CacheChain,
	objects: IndexSet<String, FxBuildHasher>,
	instances: InstancePool<InstanceKey>,
	config: EngineConfig,
}

impl fmt::Debug for DataSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DataSource")
			.field("registry", &self.registry)
			.field("columns", &self.columns)
			.field("chain", &self.chain)
			.field("objects", &self.objects.len())
			.field("instances", &self.instances)
			.field("config", &self.config)
			.finish()
	}
}

impl DataSource {
	pub fn builder() -> DataSourceBuilder {
		DataSourceBuilder::new()
	}

	pub fn registry(&self) -> &TraitRegistry<dyn ProviderClass> {
		&self.registry
	}

	pub fn columns(&self) -> &ColumnStore {
		&self.columns
	}

	pub fn chain(&self) -> &CacheChain {
		&self.chain
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn contains(&self, object_id: &str) -> bool {
		self.objects.is_empty() || self.objects.contains(object_id)
	}

	/// Declared object ids, in declaration order.
	pub fn objects(&self) -> impl Iterator<Item = &str> {
		self.objects.iter().map(String::as_str)
	}

	/// Number of realised providers currently pooled.
	pub fn pooled(&self) -> usize {
		self.instances.len()
	}

	/// Completes `key` and returns the provider realised for `object_id`.
	pub fn trait_for(&self, object_id: &str, key: &TraitKey) -> Result<Arc<dyn TraitInstance>> {
		self.check_object(object_id)?;
		let (concrete, class) = self.registry.resolve(key)?;
		self.realise(object_id, concrete, class)
	}

	/// Like [`trait_for`](Self::trait_for) but resolves through the legacy
	/// cascade, so partial keys may match pattern registrations.
	pub fn trait_for_with_fallback(&self, object_id: &str, key: &TraitKey) -> Result<Arc<dyn TraitInstance>> {
		self.check_object(object_id)?;
		let (matched, class) = self.registry.retrieve_with_fallback(key)?;
		self.realise(object_id, matched.clone(), class)
	}

	/// Walks `path` down the provider hierarchy: the first key resolves
	/// against the source's registry, each later key against the sub-traits
	/// of the provider above it.
	pub fn trait_for_path(&self, object_id: &str, path: &KeyPath) -> Result<Arc<dyn TraitInstance>> {
		let (root, rest) = path.keys().split_first().ok_or(EngineError::EmptyPath)?;
		let mut instance = self.trait_for(object_id, root)?;
		for key in rest {
			instance = instance.sub_trait(key)?;
		}
		Ok(instance)
	}

	/// Completes every level of `path` without realising any provider.
	pub fn complete_path(&self, path: &KeyPath) -> Result<KeyPath> {
		let (root, rest) = path.keys().split_first().ok_or(EngineError::EmptyPath)?;
		let (key, mut class) = self.registry.resolve(root)?;
		let mut completed = KeyPath::from(key);
		for key in rest {
			let (key, sub) = class.sub_traits().resolve_nested(key)?;
			completed = completed.join(key);
			class = sub;
		}
		Ok(completed)
	}

	/// Reads an attribute through the cache chain, computing it on a miss.
	pub fn read(&self, object_id: &str, key: &TraitKey, attribute: &str) -> Result<Value> {
		self.read_path(object_id, &KeyPath::from(key.clone()), attribute)
	}

	/// Reads an attribute of the provider at `path` through the cache chain.
	pub fn read_path(&self, object_id: &str, path: &KeyPath, attribute: &str) -> Result<Value> {
		self.check_object(object_id)?;
		let completed = self.complete_path(path)?;
		let request = CacheRequest::new(object_id, completed.clone(), attribute);
		self.chain
			.cache_request(&request, || self.trait_for_path(object_id, &completed)?.get(attribute))
	}

	/// Reads an attribute directly from its provider.
	pub fn read_uncached(&self, object_id: &str, key: &TraitKey, attribute: &str) -> Result<Value> {
		self.trait_for(object_id, key)?.get(attribute)
	}

	pub fn column_value(&self, column: &ColumnId, object_id: &str) -> Result<Value> {
		self.check_object(object_id)?;
		self.columns.value(column, object_id)
	}

	/// Attribute kinds of every provider class, grouped by key-name, with
	/// the sub-trait hierarchy nested below when `include_sub_traits` is set.
	pub fn schema(&self, include_sub_traits: bool) -> Result<Schema> {
		registry_schema(&self.registry, include_sub_traits)
	}

	fn check_object(&self, object_id: &str) -> Result<()> {
		if self.contains(object_id) {
			Ok(())
		} else {
			Err(EngineError::not_available(format!("object {object_id}")))
		}
	}

	fn realise(
		&self,
		object_id: &str,
		key: TraitKey,
		class: &Arc<dyn ProviderClass>,
	) -> Result<Arc<dyn TraitInstance>> {
		let pool_key: InstanceKey = (object_id.to_string(), key);
		let init = TraitInit {
			key: pool_key.1.clone(),
			object_id: object_id.to_string(),
			columns: Arc::clone(&self.columns),
			parent: None,
		};
		self.instances.get_or_build(pool_key, || {
			let instance = Arc::clone(class).instantiate(init)?;
			if self.config.eager {
				instance.realise()?;
			}
			Ok(instance)
		})
	}
}
