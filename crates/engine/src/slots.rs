//! Per-instance cache of lazily loaded attribute values.
//!
//! # Role
//!
//! Stores each attribute's value after its first successful load, in the
//! order attributes were first read.
//!
//! # Invariants
//!
//! - At most one load per attribute is in flight. A second reader of an
//!   attribute that is still loading blocks until the first load settles,
//!   then reuses its value.
//! - Failures are never cached. When a load fails the in-flight marker is
//!   removed and a waiting reader (or the next caller) retries the load.

use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::value::Value;

#[cfg(test)]
mod tests;

#[derive(Debug)]
enum SlotState {
	Loading,
	Ready(Value),
}

#[derive(Debug, Default)]
pub struct SlotCache {
	states: Mutex<IndexMap<&'static str, SlotState>>,
	settled: Condvar,
}

impl SlotCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached value, if loaded.
	pub fn cached(&self, name: &str) -> Option<Value> {
		match self.states.lock().get(name) {
			Some(SlotState::Ready(value)) => Some(value.clone()),
			_ => None,
		}
	}

	pub fn is_cached(&self, name: &str) -> bool {
		matches!(self.states.lock().get(name), Some(SlotState::Ready(_)))
	}

	/// Names of loaded attributes, in load order.
	pub fn loaded(&self) -> Vec<&'static str> {
		self.states
			.lock()
			.iter()
			.filter(|(_, state)| matches!(state, SlotState::Ready(_)))
			.map(|(name, _)| *name)
			.collect()
	}

	/// Returns the cached value or runs `load` to produce it.
	pub fn get_or_load(&self, name: &'static str, load: impl FnOnce() -> Result<Value>) -> Result<Value> {
		{
			let mut states = self.states.lock();
			loop {
				match states.get(name) {
					Some(SlotState::Ready(value)) => return Ok(value.clone()),
					Some(SlotState::Loading) => self.settled.wait(&mut states),
					None => {
						states.insert(name, SlotState::Loading);
						break;
					}
				}
			}
		}

		let mut pending = PendingLoad {
			cache: self,
			name,
			outcome: None,
		};
		let result = load();
		pending.outcome = Some(result.as_ref().ok().cloned());
		drop(pending);
		result
	}

	/// Forgets a loaded value so the next read loads it again.
	pub fn invalidate(&self, name: &str) -> bool {
		let mut states = self.states.lock();
		match states.get(name) {
			Some(SlotState::Ready(_)) => states.shift_remove(name).is_some(),
			_ => false,
		}
	}
}

/// Settles an in-flight load, also when the loader unwinds.
struct PendingLoad<'a> {
	cache: &'a SlotCache,
	name: &'static str,
	/// `Some(Some(v))` on success, `Some(None)` on failure, `None` on unwind.
	outcome: Option<Option<Value>>,
}

impl Drop for PendingLoad<'_> {
	fn drop(&mut self) {
		let mut states = self.cache.states.lock();
		match self.outcome.take().flatten() {
			Some(value) => {
				states.insert(self.name, SlotState::Ready(value));
			}
			None => {
				states.shift_remove(self.name);
			}
		}
		drop(states);
		self.cache.settled.notify_all();
	}
}
