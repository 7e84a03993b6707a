//! Reference-counted preload/cleanup of a provider's resources.
//!
//! # Role
//!
//! A [`Lifecycle`] wraps the expensive resource behind one provider instance
//! (open files, live connections). Overlapping readers share a single
//! preload; the resource is cleaned up when the last reader releases it.
//!
//! # Invariants
//!
//! - `open_count` never goes below zero. Releasing at zero is
//!   [`EngineError::UnbalancedRelease`] and is logged at error level.
//! - `preload` runs exactly once per 0 -> 1 transition and `cleanup` exactly
//!   once per 1 -> 0 transition. The count lock is held across both hooks, so
//!   concurrent acquirers wait for the preload to finish.
//! - A failed preload leaves the count at zero. A failed cleanup still closes
//!   the count and reports the failure.

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::error::{EngineError, Result};
use crate::provider::Provider;


pub struct Lifecycle {
	label: String,
	open_count: Mutex<usize>,
}

impl std::fmt::Debug for Lifecycle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Lifecycle")
			.field("label", &self.label)
			.field("open_count", &self.open_count())
			.finish()
	}
}

impl Lifecycle {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			open_count: Mutex::new(0),
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn open_count(&self) -> usize {
		*self.open_count.lock()
	}

	pub fn is_open(&self) -> bool {
		self.open_count() > 0
	}

	/// Opens the resource if it is closed, then takes a reference.
	pub fn acquire(&self, provider: &dyn Provider) -> Result<()> {
		let mut count = self.open_count.lock();
		if *count == 0 {
			debug!(resource = %self.label, "preload");
			provider
				.preload()
				.map_err(|e| e.into_engine(|| format!("preload of {}", self.label)))?;
		}
		*count += 1;
		trace!(resource = %self.label, open_count = *count, "acquired");
		Ok(())
	}

	/// Drops a reference, cleaning up when it was the last one.
	pub fn release(&self, provider: &dyn Provider) -> Result<()> {
		let mut count = self.open_count.lock();
		if *count == 0 {
			error!(resource = %self.label, "release without a matching acquire");
			return Err(EngineError::UnbalancedRelease(self.label.clone()));
		}
		*count -= 1;
		trace!(resource = %self.label, open_count = *count, "released");
		if *count == 0 {
			debug!(resource = %self.label, "cleanup");
			provider
				.cleanup()
				.map_err(|e| e.into_engine(|| format!("cleanup of {}", self.label)))?;
		}
		Ok(())
	}

	/// Acquires and returns a guard that releases on drop.
	pub fn guard<'a>(&'a self, provider: &'a dyn Provider) -> Result<ResourceGuard<'a>> {
		self.acquire(provider)?;
		Ok(ResourceGuard {
			lifecycle: self,
			provider,
			armed: true,
		})
	}

	/// Runs `body` with the resource open, releasing on every exit path.
	///
	/// An error from `body` takes precedence over a release error.
	pub fn scoped<R>(&self, provider: &dyn Provider, body: impl FnOnce() -> Result<R>) -> Result<R> {
		let guard = self.guard(provider)?;
		let result = body();
		let released = guard.release();
		let value = result?;
		released?;
		Ok(value)
	}
}

/// Holds one reference on a [`Lifecycle`] and releases it when dropped,
/// including during unwinding.
#[must_use = "the resource is released as soon as the guard is dropped"]
pub struct ResourceGuard<'a> {
	lifecycle: &'a Lifecycle,
	provider: &'a dyn Provider,
	armed: bool,
}

impl ResourceGuard<'_> {
	/// Releases now and reports any cleanup failure.
	pub fn release(mut self) -> Result<()> {
		self.armed = false;
		self.lifecycle.release(self.provider)
	}
}

impl Drop for ResourceGuard<'_> {
	fn drop(&mut self) {
		if self.armed
			&& let Err(err) = self.lifecycle.release(self.provider)
		{
			warn!(resource = %self.lifecycle.label, error = %err, "release on drop failed");
		}
	}
}
