//! Ordered chain of cache layers in front of live computation.
//!
//! # Role
//!
//! [`CacheChain::cache_request`] asks each layer in order for a value. The
//! first hit wins; with no hit the value is computed. The value is then
//! written back into every writable layer in front of the one that produced
//! it.
//!
//! # Invariants
//!
//! - [`EngineError::DataNotAvailable`] from a layer means "try the next one".
//!   Any other layer error aborts the read.
//! - Write-back failures are logged and never fail the read.
//! - The chain is a `Vec`: ordered, finite and acyclic by construction.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use orrery_key::KeyPath;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{EngineError, Result};
use crate::value::Value;


/// One read: an attribute of the provider at `key_path` for one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheRequest {
	pub object_id: String,
	pub key_path: KeyPath,
	pub attribute: String,
}

impl CacheRequest {
	pub fn new(object_id: impl Into<String>, key_path: impl Into<KeyPath>, attribute: impl Into<String>) -> Self {
		Self {
			object_id: object_id.into(),
			key_path: key_path.into(),
			attribute: attribute.into(),
		}
	}
}

impl fmt::Display for CacheRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}.{}", self.object_id, self.key_path, self.attribute)
	}
}

/// A store of resolved values addressed by [`CacheRequest`].
///
/// Layers synchronise internally; the chain holds no lock across them.
pub trait CacheLayer: Send + Sync {
	fn name(&self) -> &str;

	/// Cheap check. May answer `true` for a value `get` then cannot find,
	/// never `false` for one it holds.
	fn available(&self, request: &CacheRequest) -> bool;

	/// Fails with [`EngineError::DataNotAvailable`] on a miss.
	fn get(&self, request: &CacheRequest) -> Result<Value>;

	fn put(&self, request: &CacheRequest, value: &Value) -> Result<()>;

	/// Read-only layers are skipped during write-back.
	fn read_only(&self) -> bool {
		true
	}

	/// Drops any stored value for `request`.
	fn clear(&self, _request: &CacheRequest) -> Result<()> {
		Ok(())
	}
}

/// In-process layer over an LRU map.
pub struct MemoryCache {
	name: String,
	entries: Mutex<LruCache<CacheRequest, Value>>,
	read_only: bool,
}

impl fmt::Debug for MemoryCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryCache")
			.field("name", &self.name)
			.field("len", &self.len())
			.field("read_only", &self.read_only)
			.finish()
	}
}

impl MemoryCache {
	/// Creates a writable layer. `None` capacity is unbounded.
	pub fn new(name: impl Into<String>, capacity: Option<NonZeroUsize>) -> Self {
		let entries = match capacity {
			Some(capacity) => LruCache::new(capacity),
			None => LruCache::unbounded(),
		};
		Self {
			name: name.into(),
			entries: Mutex::new(entries),
			read_only: false,
		}
	}

	/// Marks the layer read-only. Use [`MemoryCache::seed`] to fill it.
	pub fn into_read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	/// Stores a value regardless of the read-only flag.
	pub fn seed(&self, request: CacheRequest, value: Value) {
		self.entries.lock().put(request, value);
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl CacheLayer for MemoryCache {
	fn name(&self) -> &str {
		&self.name
	}

	fn available(&self, request: &CacheRequest) -> bool {
		self.entries.lock().contains(request)
	}

	fn get(&self, request: &CacheRequest) -> Result<Value> {
		self.entries
			.lock()
			.get(request)
			.cloned()
			.ok_or_else(|| EngineError::not_available(request.to_string()))
	}

	fn put(&self, request: &CacheRequest, value: &Value) -> Result<()> {
		if self.read_only {
			return Err(EngineError::Cache {
				layer: self.name.clone(),
				message: "layer is read-only".to_string(),
			});
		}
		if let Some((evicted, _)) = self.entries.lock().push(request.clone(), value.clone())
			&& &evicted != request
		{
			trace!(layer = %self.name, evicted = %evicted, "memory cache eviction");
		}
		Ok(())
	}

	fn read_only(&self) -> bool {
		self.read_only
	}

	fn clear(&self, request: &CacheRequest) -> Result<()> {
		self.entries.lock().pop(request);
		Ok(())
	}
}

#[derive(Clone, Default)]
pub struct CacheChain {
	layers: Vec<Arc<dyn CacheLayer>>,
}

impl fmt::Debug for CacheChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.layers.iter().map(|layer| layer.name())).finish()
	}
}

impl CacheChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a layer behind the existing ones.
	pub fn push(&mut self, layer: Arc<dyn CacheLayer>) {
		self.layers.push(layer);
	}

	pub fn with_layer(mut self, layer: Arc<dyn CacheLayer>) -> Self {
		self.push(layer);
		self
	}

	pub fn layers(&self) -> &[Arc<dyn CacheLayer>] {
		&self.layers
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// Serves `request` from the first layer holding it, else from `compute`.
	pub fn cache_request(&self, request: &CacheRequest, compute: impl FnOnce() -> Result<Value>) -> Result<Value> {
		let (depth, value) = match self.lookup(request)? {
			Some(hit) => hit,
			None => {
				trace!(request = %request, "cache miss, computing");
				(self.layers.len(), compute()?)
			}
		};
		self.write_back(request, &value, depth);
		Ok(value)
	}

	/// Drops `request` from every layer.
	pub fn clear(&self, request: &CacheRequest) -> Result<()> {
		for layer in &self.layers {
			layer.clear(request)?;
		}
		Ok(())
	}

	fn lookup(&self, request: &CacheRequest) -> Result<Option<(usize, Value)>> {
		for (depth, layer) in self.layers.iter().enumerate() {
			if !layer.available(request) {
				continue;
			}
			match layer.get(request) {
				Ok(value) => {
					debug!(layer = layer.name(), depth, request = %request, "cache hit");
					return Ok(Some((depth, value)));
				}
				Err(err) if err.is_not_available() => {
					trace!(layer = layer.name(), request = %request, "layer fell through");
				}
				Err(err) => return Err(err),
			}
		}
		Ok(None)
	}

	fn write_back(&self, request: &CacheRequest, value: &Value, depth: usize) {
		for layer in self.layers[..depth].iter().filter(|layer| !layer.read_only()) {
			if let Err(err) = layer.put(request, value) {
				warn!(layer = layer.name(), request = %request, error = %err, "cache write-back failed");
			}
		}
	}
}
