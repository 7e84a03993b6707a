use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::error::EngineError;

#[test]
fn test_second_read_uses_cache() {
	let slots = SlotCache::new();
	let calls = AtomicUsize::new(0);
	let load = || {
		calls.fetch_add(1, Ordering::SeqCst);
		Ok(Value::from(1.5))
	};

	assert_eq!(slots.get_or_load("flux", load).unwrap(), Value::Float(1.5));
	assert_eq!(slots.get_or_load("flux", load).unwrap(), Value::Float(1.5));
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(slots.is_cached("flux"));
	assert_eq!(slots.cached("flux"), Some(Value::Float(1.5)));
}

#[test]
fn test_failures_are_not_cached() {
	let slots = SlotCache::new();
	let err = slots
		.get_or_load("flux", || Err(EngineError::not_available("flux")))
		.unwrap_err();
	assert!(err.is_not_available());
	assert!(!slots.is_cached("flux"));

	assert_eq!(slots.get_or_load("flux", || Ok(Value::from(2_i64))).unwrap(), Value::Int(2));
}

#[test]
fn test_panicking_loader_clears_in_flight_marker() {
	let slots = SlotCache::new();
	let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
		let _ = slots.get_or_load("flux", || panic!("boom"));
	}));
	assert!(outcome.is_err());
	assert_eq!(slots.get_or_load("flux", || Ok(Value::from("ok"))).unwrap(), Value::from("ok"));
}

#[test]
fn test_concurrent_readers_share_one_load() {
	const READERS: usize = 6;
	let slots = SlotCache::new();
	let calls = AtomicUsize::new(0);
	let start = Barrier::new(READERS);

	thread::scope(|s| {
		for _ in 0..READERS {
			s.spawn(|| {
				start.wait();
				let value = slots
					.get_or_load("flux", || {
						calls.fetch_add(1, Ordering::SeqCst);
						thread::sleep(Duration::from_millis(20));
						Ok(Value::from(3_i64))
					})
					.unwrap();
				assert_eq!(value, Value::Int(3));
			});
		}
	});

	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_loaded_keeps_order_and_invalidate() {
	let slots = SlotCache::new();
	slots.get_or_load("variance", || Ok(Value::from(1_i64))).unwrap();
	slots.get_or_load("value", || Ok(Value::from(2_i64))).unwrap();
	assert_eq!(slots.loaded(), vec!["variance", "value"]);

	assert!(slots.invalidate("variance"));
	assert!(!slots.invalidate("variance"));
	assert_eq!(slots.loaded(), vec!["value"]);
}
