//! Bounded pool of realised providers.
//!
//! # Role
//!
//! Hands out one shared [`TraitInstance`] per key, building it on first use.
//! The data source pools top-level providers per `(object, key)`; every
//! realised provider pools its own sub-traits per key.
//!
//! # Invariants
//!
//! - At most one instance per key is live. The first caller builds it while
//!   later callers of the same key wait, then share the result.
//! - A failed build leaves nothing behind; the next caller builds again.
//! - The pool evicts the least recently used instance. An evicted instance
//!   that a caller still holds is handed out again instead of being rebuilt.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::error::Result;
use crate::provider::TraitInstance;

pub(crate) struct InstancePool<K: Hash + Eq> {
	state: Mutex<PoolState<K>>,
	settled: Condvar,
}

struct PoolState<K: Hash + Eq> {
	instances: LruCache<K, Arc<dyn TraitInstance>>,
	/// Evicted instances that callers may still hold.
	evicted: FxHashMap<K, Weak<dyn TraitInstance>>,
	/// Keys whose instance is being built.
	building: FxHashSet<K>,
}

impl<K: Hash + Eq + Clone + fmt::Debug> PoolState<K> {
	fn live(&mut self, key: &K) -> Option<Arc<dyn TraitInstance>> {
		if let Some(instance) = self.instances.get(key) {
			return Some(Arc::clone(instance));
		}
		let instance = self.evicted.remove(key)?.upgrade()?;
		trace!(?key, "evicted provider still held");
		self.admit(key.clone(), Arc::clone(&instance));
		Some(instance)
	}

	fn admit(&mut self, key: K, instance: Arc<dyn TraitInstance>) {
		let Some((evicted_key, evicted)) = self.instances.push(key, instance) else {
			return;
		};
		debug!(key = ?evicted_key, "provider evicted");
		self.evicted.retain(|_, weak| weak.strong_count() > 0);
		if Arc::strong_count(&evicted) > 1 {
			self.evicted.insert(evicted_key, Arc::downgrade(&evicted));
		}
	}
}

impl<K: Hash + Eq + Clone + fmt::Debug> InstancePool<K> {
	pub(crate) fn new(capacity: NonZeroUsize) -> Self {
		Self {
			state: Mutex::new(PoolState {
				instances: LruCache::new(capacity),
				evicted: FxHashMap::default(),
				building: FxHashSet::default(),
			}),
			settled: Condvar::new(),
		}
	}

	/// Number of pooled instances.
	pub(crate) fn len(&self) -> usize {
		self.state.lock().instances.len()
	}

	/// Returns the live instance for `key` or runs `build` to create it.
	pub(crate) fn get_or_build(
		&self,
		key: K,
		build: impl FnOnce() -> Result<Arc<dyn TraitInstance>>,
	) -> Result<Arc<dyn TraitInstance>> {
		{
			let mut state = self.state.lock();
			loop {
				if let Some(instance) = state.live(&key) {
					trace!(?key, "provider pool hit");
					return Ok(instance);
				}
				if !state.building.contains(&key) {
					state.building.insert(key.clone());
					break;
				}
				self.settled.wait(&mut state);
			}
		}

		let mut pending = PendingBuild {
			pool: self,
			key,
			instance: None,
		};
		let instance = build()?;
		pending.instance = Some(Arc::clone(&instance));
		Ok(instance)
	}
}

impl<K: Hash + Eq> fmt::Debug for InstancePool<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("InstancePool")
			.field("instances", &state.instances.len())
			.field("building", &state.building.len())
			.finish()
	}
}

/// Clears the in-flight marker of a build, admitting the instance on
/// success. Runs on every exit path, unwinding included.
struct PendingBuild<'a, K: Hash + Eq + Clone + fmt::Debug> {
	pool: &'a InstancePool<K>,
	key: K,
	instance: Option<Arc<dyn TraitInstance>>,
}

impl<K: Hash + Eq + Clone + fmt::Debug> Drop for PendingBuild<'_, K> {
	fn drop(&mut self) {
		let mut state = self.pool.state.lock();
		state.building.remove(&self.key);
		if let Some(instance) = self.instance.take() {
			state.admit(self.key.clone(), instance);
		}
		drop(state);
		self.pool.settled.notify_all();
	}
}
