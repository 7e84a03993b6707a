//! End-to-end scenarios across key parsing, registry resolution, provider
//! lifecycles and the cache chain.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use orrery_engine::{
	ArrayData, ArrayValue, CacheLayer, CacheRequest, DataSource, ElementType, EngineError, LoadFailure,
	MemoryCache, Provider, ProviderDef, Result, TraitInit, Value, ValueKind,
};
use orrery_key::{TraitKey, TraitName};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Counters {
	preloads: AtomicUsize,
	cleanups: AtomicUsize,
	loads: AtomicUsize,
}

struct SpectralCube {
	counters: Arc<Counters>,
	start: Option<Arc<Barrier>>,
}

impl Provider for SpectralCube {
	fn preload(&self) -> std::result::Result<(), LoadFailure> {
		self.counters.preloads.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	fn cleanup(&self) -> std::result::Result<(), LoadFailure> {
		self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

impl SpectralCube {
	fn load(&self, offset: f64) -> std::result::Result<Value, LoadFailure> {
		if let Some(start) = &self.start {
			start.wait();
		}
		self.counters.loads.fetch_add(1, Ordering::SeqCst);
		let data = ArrayData::Float((0..8_i32).map(|i| f64::from(i) + offset).collect());
		Ok(ArrayValue::new([2, 2, 2], data)?.into())
	}
}

fn cube_source(counters: Arc<Counters>, start: Option<Arc<Barrier>>) -> DataSource {
	let def = ProviderDef::builder("SpectralCube", "spectral_cube", move |_init: &TraitInit| {
		Ok(SpectralCube {
			counters: Arc::clone(&counters),
			start: start.clone(),
		})
	})
	.qualifier("red")
	.branch("releaseA", ["v1"])
	.unit("1e-16 erg/s/cm2/A")
	.attribute("value", ValueKind::array(ElementType::Float, 3), |cube: &SpectralCube| {
		cube.load(0.0)
	})
	.attribute("variance", ValueKind::array(ElementType::Float, 3), |cube: &SpectralCube| {
		cube.load(0.5)
	})
	.build()
	.expect("valid declaration");

	let mut builder = DataSource::builder();
	builder
		.provider(Arc::new(def))
		.expect("registers")
		.objects(["9011900001", "9011900002"])
		.memory_cache();
	builder.build().expect("builds")
}

#[test]
fn test_pattern_lookup_matches_concrete_lookup() {
	let _ = tracing_subscriber::fmt::try_init();
	let source = cube_source(Arc::default(), None);

	let pattern: TraitKey = "spectral_cube-red".parse().unwrap();
	let concrete: TraitKey = "spectral_cube-red:releaseA(v1)".parse().unwrap();
	assert_eq!(pattern.branch(), None);
	assert_eq!(pattern.version(), None);

	let name: TraitName = "spectral_cube-red".parse().unwrap();
	let defaults = source.registry().defaults().get(&name).unwrap();
	assert_eq!(defaults.default_branch(), Some("releaseA"));
	assert_eq!(defaults.version_for("releaseA"), Some("v1"));

	let by_pattern = source.read_uncached("9011900001", &pattern, "value").unwrap();
	let by_concrete = source.read_uncached("9011900001", &concrete, "value").unwrap();
	assert_eq!(by_pattern, by_concrete);
	assert_eq!(source.registry().complete(&pattern).unwrap(), concrete);
}

#[test]
fn test_concurrent_reads_share_one_preload_and_cleanup() {
	let _ = tracing_subscriber::fmt::try_init();
	let counters = Arc::new(Counters::default());
	let start = Arc::new(Barrier::new(2));
	let source = cube_source(Arc::clone(&counters), Some(start));
	let key: TraitKey = "spectral_cube-red".parse().unwrap();
	let instance = source.trait_for("9011900001", &key).unwrap();

	thread::scope(|s| {
		for attribute in ["value", "variance"] {
			let instance = Arc::clone(&instance);
			s.spawn(move || instance.get(attribute).unwrap());
		}
	});

	assert_eq!(counters.preloads.load(Ordering::SeqCst), 1);
	assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
	assert_eq!(counters.loads.load(Ordering::SeqCst), 2);
	assert_eq!(instance.open_count(), 0);

	let variance = instance.as_variance().unwrap().variance().unwrap();
	assert_eq!(variance.as_array().unwrap().shape().to_vec(), vec![2, 2, 2]);
	assert_eq!(instance.as_shape().unwrap().shape().unwrap(), vec![2, 2, 2]);
	assert_eq!(instance.as_unit().unwrap().unit(), "1e-16 erg/s/cm2/A");
	assert_eq!(counters.preloads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_write_back_serves_repeat_reads_without_loader() {
	let _ = tracing_subscriber::fmt::try_init();
	let counters = Arc::new(Counters::default());
	let source = cube_source(Arc::clone(&counters), None);
	let key: TraitKey = "spectral_cube-red".parse().unwrap();

	let first = source.read("9011900002", &key, "value").unwrap();
	let second = source.read("9011900002", &key, "value").unwrap();
	assert_eq!(first, second);
	assert_eq!(counters.loads.load(Ordering::SeqCst), 1);

	let concrete: TraitKey = "spectral_cube-red:releaseA(v1)".parse().unwrap();
	let request = CacheRequest::new("9011900002", concrete, "value");
	assert!(source.chain().layers()[0].available(&request));
}

/// A remote layer that has nothing yet and says so on every get.
struct ColdRemote {
	gets: AtomicUsize,
}

impl CacheLayer for ColdRemote {
	fn name(&self) -> &str {
		"remote"
	}

	fn available(&self, _request: &CacheRequest) -> bool {
		true
	}

	fn get(&self, request: &CacheRequest) -> Result<Value> {
		self.gets.fetch_add(1, Ordering::SeqCst);
		Err(EngineError::not_available(request.to_string()))
	}

	fn put(&self, _request: &CacheRequest, _value: &Value) -> Result<()> {
		Ok(())
	}
}

#[test]
fn test_not_available_layer_falls_through_to_computation() {
	let _ = tracing_subscriber::fmt::try_init();
	let remote = Arc::new(ColdRemote {
		gets: AtomicUsize::new(0),
	});
	let def = ProviderDef::builder("Catalog", "catalog", |_init: &TraitInit| {
		Ok(SpectralCube {
			counters: Arc::default(),
			start: None,
		})
	})
	.qualifier("sami")
	.branch("dr3", ["v1"])
	.attribute("redshift", ValueKind::FLOAT, |_: &SpectralCube| Ok(Value::from(0.05)))
	.build()
	.unwrap();

	let front = Arc::new(MemoryCache::new("front", None));
	let mut builder = DataSource::builder();
	builder
		.provider(Arc::new(def))
		.unwrap()
		.cache_layer(front.clone())
		.cache_layer(remote.clone());
	let source = builder.build().unwrap();

	let key: TraitKey = "catalog-sami".parse().unwrap();
	assert_eq!(source.read("1", &key, "redshift").unwrap(), Value::Float(0.05));
	assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
	assert_eq!(front.len(), 1);

	assert_eq!(source.read("1", &key, "redshift").unwrap(), Value::Float(0.05));
	assert_eq!(remote.gets.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exported_value_round_trips() {
	let source = cube_source(Arc::default(), None);
	let key: TraitKey = "spectral_cube-red:releaseA(v1)".parse().unwrap();
	let value = source.read("9011900001", &key, "variance").unwrap();

	let decoded = Value::from_bytes(&value.as_bytes().unwrap()).unwrap();
	assert_eq!(decoded, value);
	let rows = value.as_table_rows();
	assert_eq!(rows.len(), 9);
	assert_eq!(rows[0], ["axis_0", "axis_1", "axis_2", "value"]);
	assert_eq!(rows[8], ["1", "1", "1", "7.5"]);
}
