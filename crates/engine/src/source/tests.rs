use std::sync::atomic::{AtomicUsize, Ordering};

use orrery_key::{KeyPath, Timestamp};
use pretty_assertions::assert_eq;

use super::*;
use crate::column::FnColumn;
use crate::error::LoadFailure;
use crate::provider::{Provider, ProviderDef};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

struct Catalog {
	object_id: String,
}

impl Provider for Catalog {}

fn catalog(loads: Arc<AtomicUsize>) -> Arc<dyn ProviderClass> {
	let def = ProviderDef::builder("Catalog", "catalog", |init: &TraitInit| {
		Ok(Catalog {
			object_id: init.object_id.clone(),
		})
	})
	.qualifier("sami")
	.branch("dr3", ["v2", "v1"])
	.branch("dr2", ["v1"])
	.attribute("id_length", ValueKind::INT, move |c: &Catalog| {
		loads.fetch_add(1, Ordering::SeqCst);
		Ok(Value::from(c.object_id.len() as i64))
	})
	.optional_attribute("mass", ValueKind::FLOAT, |_: &Catalog| {
		Err(LoadFailure::not_available("mass"))
	})
	.build()
	.unwrap();
	Arc::new(def)
}

fn source(config: EngineConfig) -> (DataSource, Arc<AtomicUsize>) {
	let loads = Arc::new(AtomicUsize::new(0));
	let mut builder = DataSource::builder();
	builder
		.provider(catalog(Arc::clone(&loads)))
		.unwrap()
		.objects(["a", "bb", "ccc"])
		.memory_cache()
		.config(config);
	(builder.build().unwrap(), loads)
}

fn key(s: &str) -> TraitKey {
	TraitKey::parse(s).unwrap()
}

#[test]
fn test_pattern_and_concrete_key_share_instance() {
	let (source, _) = source(EngineConfig::default());
	let by_pattern = source.trait_for("bb", &key("catalog-sami")).unwrap();
	let by_key = source.trait_for("bb", &key("catalog-sami:dr3(v2)")).unwrap();
	assert!(Arc::ptr_eq(&by_pattern, &by_key));
	assert_eq!(by_pattern.key(), &key("catalog-sami:dr3(v2)"));
	assert_eq!(source.pooled(), 1);
}

#[test]
fn test_read_goes_through_memory_layer() {
	let (source, loads) = source(EngineConfig::default());
	assert_eq!(source.read("ccc", &key("catalog-sami"), "id_length").unwrap(), Value::Int(3));
	assert_eq!(
		source.read("ccc", &key("catalog-sami:dr3(v2)"), "id_length").unwrap(),
		Value::Int(3)
	);
	assert_eq!(loads.load(Ordering::SeqCst), 1);

	let memory = &source.chain().layers()[0];
	assert_eq!(memory.name(), MEMORY_LAYER);
	let request = CacheRequest::new("ccc", key("catalog-sami:dr3(v2)"), "id_length");
	assert_eq!(memory.get(&request).unwrap(), Value::Int(3));
}

#[test]
fn test_unknown_object_is_not_available() {
	let (source, _) = source(EngineConfig::default());
	assert!(!source.contains("dddd"));
	assert!(source.read("dddd", &key("catalog-sami"), "id_length").unwrap_err().is_not_available());
	assert_eq!(source.objects().collect::<Vec<_>>(), vec!["a", "bb", "ccc"]);
}

#[test]
fn test_no_declared_objects_accepts_any() {
	let mut builder = DataSource::builder();
	builder.provider(catalog(Arc::new(AtomicUsize::new(0)))).unwrap();
	let source = builder.build().unwrap();
	assert!(source.contains("anything"));
	assert_eq!(source.read_uncached("abcd", &key("catalog-sami"), "id_length").unwrap(), Value::Int(4));
}

#[test]
fn test_unknown_branch_and_key_errors() {
	let (source, _) = source(EngineConfig::default());
	assert!(matches!(
		source.trait_for("a", &key("catalog-sami:dr9")),
		Err(EngineError::Registry(orrery_registry::RegistryError::UnknownBranch { .. }))
	));
	assert!(matches!(
		source.trait_for("a", &key("catalog-gama")),
		Err(EngineError::Registry(orrery_registry::RegistryError::UnknownKeyName { .. }))
	));
	assert!(matches!(
		source.trait_for("a", &key("catalog-sami:dr2(v9)")),
		Err(EngineError::Registry(orrery_registry::RegistryError::UnknownKey { .. }))
	));
}

#[test]
fn test_pool_is_bounded() {
	let config = EngineConfig {
		trait_cache_capacity: 2,
		..EngineConfig::default()
	};
	let (source, _) = source(config);
	let first = Arc::downgrade(&source.trait_for("a", &key("catalog-sami")).unwrap());
	source.trait_for("bb", &key("catalog-sami")).unwrap();
	source.trait_for("ccc", &key("catalog-sami")).unwrap();
	assert_eq!(source.pooled(), 2);
	assert!(first.upgrade().is_none());

	source.trait_for("a", &key("catalog-sami")).unwrap();
	assert_eq!(source.pooled(), 2);
}

#[test]
fn test_evicted_instance_still_held_is_reused() {
	let config = EngineConfig {
		trait_cache_capacity: 1,
		..EngineConfig::default()
	};
	let (source, _) = source(config);
	let held = source.trait_for("a", &key("catalog-sami")).unwrap();
	source.trait_for("bb", &key("catalog-sami")).unwrap();
	assert_eq!(source.pooled(), 1);

	let again = source.trait_for("a", &key("catalog-sami")).unwrap();
	assert!(Arc::ptr_eq(&held, &again));
}

#[test]
fn test_concurrent_first_reads_construct_once() {
	static BUILT: AtomicUsize = AtomicUsize::new(0);

	struct Slow;
	impl Provider for Slow {}

	let def = ProviderDef::builder("Slow", "image", |_init: &TraitInit| {
		BUILT.fetch_add(1, Ordering::SeqCst);
		std::thread::sleep(std::time::Duration::from_millis(20));
		Ok(Slow)
	})
	.qualifier("red")
	.attribute("value", ValueKind::INT, |_: &Slow| Ok(Value::from(1_i64)))
	.build()
	.unwrap();
	let mut builder = DataSource::builder();
	builder.provider(Arc::new(def)).unwrap().config(EngineConfig {
		eager: true,
		..EngineConfig::default()
	});
	let source = builder.build().unwrap();
	let start = std::sync::Barrier::new(4);

	let instances: Vec<_> = std::thread::scope(|s| {
		let handles: Vec<_> = (0..4)
			.map(|_| {
				s.spawn(|| {
					start.wait();
					source.trait_for("x", &key("image-red")).unwrap()
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert_eq!(BUILT.load(Ordering::SeqCst), 1);
	assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
	assert_eq!(source.pooled(), 1);
}

#[test]
fn test_eager_realises_on_construction() {
	let config = EngineConfig {
		eager: true,
		..EngineConfig::default()
	};
	let (source, loads) = source(config);
	let instance = source.trait_for("a", &key("catalog-sami:dr2")).unwrap();
	assert!(instance.is_cached("id_length"));
	assert!(!instance.is_cached("mass"));
	assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalid_config_rejected_at_build() {
	let mut builder = DataSource::builder();
	builder.config(EngineConfig {
		trait_cache_capacity: 0,
		..EngineConfig::default()
	});
	assert!(matches!(builder.build(), Err(EngineError::Config(_))));
}

#[test]
fn test_schema_groups_by_name() {
	let (source, _) = source(EngineConfig::default());
	let schema = source.schema(true).unwrap();
	let name: TraitName = "catalog-sami".parse().unwrap();
	assert_eq!(
		schema[&name].attributes.clone().into_iter().collect::<Vec<_>>(),
		vec![("id_length", ValueKind::INT), ("mass", ValueKind::FLOAT)]
	);
	assert!(schema[&name].sub_traits.is_empty());
}

struct Wcs {
	parent_key: String,
}

impl Provider for Wcs {}

fn nested_source(wcs_loads: Arc<AtomicUsize>) -> DataSource {
	let wcs = ProviderDef::builder("Wcs", "wcs", |init: &TraitInit| {
		let parent = init.parent.as_ref().ok_or_else(|| LoadFailure::msg("wcs needs a parent"))?;
		Ok(Wcs {
			parent_key: parent.key().to_string(),
		})
	})
	.attribute("parent", ValueKind::STRING, move |wcs: &Wcs| {
		wcs_loads.fetch_add(1, Ordering::SeqCst);
		Ok(Value::from(wcs.parent_key.as_str()))
	})
	.build()
	.unwrap();
	let image = ProviderDef::builder("Image", "image", |_init: &TraitInit| Ok(Catalog { object_id: String::new() }))
		.qualifier("r")
		.branch("dr1", ["v2", "v1"])
		.attribute("exposure", ValueKind::FLOAT, |_: &Catalog| Ok(Value::from(30.0)))
		.sub_trait(Arc::new(wcs))
		.build()
		.unwrap();

	let mut builder = DataSource::builder();
	builder.provider(Arc::new(image)).unwrap().memory_cache();
	builder.build().unwrap()
}

#[test]
fn test_read_path_walks_sub_traits_and_caches() {
	let loads = Arc::new(AtomicUsize::new(0));
	let source = nested_source(Arc::clone(&loads));
	let path = KeyPath::parse("image-r/wcs").unwrap();

	let completed = source.complete_path(&path).unwrap();
	assert_eq!(completed.to_string(), "image-r:dr1(v2)/wcs");

	assert_eq!(source.read_path("o1", &path, "parent").unwrap(), Value::from("image-r:dr1(v2)"));
	let explicit = KeyPath::parse("image-r:dr1(v2)/wcs").unwrap();
	assert_eq!(source.read_path("o1", &explicit, "parent").unwrap(), Value::from("image-r:dr1(v2)"));
	assert_eq!(loads.load(Ordering::SeqCst), 1);

	let request = CacheRequest::new("o1", completed.clone(), "parent");
	assert!(source.chain().layers()[0].available(&request));

	let older = KeyPath::parse("image-r:dr1(v1)/wcs").unwrap();
	assert_eq!(source.read_path("o1", &older, "parent").unwrap(), Value::from("image-r:dr1(v1)"));
	assert_eq!(loads.load(Ordering::SeqCst), 2);

	let wcs = source.trait_for_path("o1", &completed).unwrap();
	assert_eq!(wcs.path(), &completed);
	assert!(Arc::ptr_eq(&wcs, &source.trait_for_path("o1", &path).unwrap()));
}

#[test]
fn test_path_errors() {
	let source = nested_source(Arc::new(AtomicUsize::new(0)));
	assert!(matches!(source.read_path("o1", &KeyPath::new(), "parent"), Err(EngineError::EmptyPath)));
	assert!(matches!(
		source.read_path("o1", &KeyPath::parse("image-r/psf").unwrap(), "fwhm"),
		Err(EngineError::Registry(orrery_registry::RegistryError::UnknownKey { .. }))
	));
	assert!(matches!(
		source.read_path("o1", &KeyPath::parse("image-r/wcs").unwrap(), "exposure"),
		Err(EngineError::UnknownAttribute { .. })
	));
}

#[test]
fn test_schema_nests_sub_traits() {
	let source = nested_source(Arc::new(AtomicUsize::new(0)));
	let image: TraitName = "image-r".parse().unwrap();
	let wcs: TraitName = "wcs".parse().unwrap();

	let nested = source.schema(true).unwrap();
	assert_eq!(
		nested[&image].attributes.keys().copied().collect::<Vec<_>>(),
		vec!["exposure"]
	);
	assert_eq!(
		nested[&image].sub_traits[&wcs].attributes.keys().copied().collect::<Vec<_>>(),
		vec!["parent"]
	);

	let flat = source.schema(false).unwrap();
	assert!(flat[&image].sub_traits.is_empty());
}

#[test]
fn test_explicit_defaults_override_declaration_order() {
	let mut builder = DataSource::builder();
	let name: TraitName = "catalog-sami".parse().unwrap();
	builder
		.provider(catalog(Arc::new(AtomicUsize::new(0))))
		.unwrap()
		.set_default_branch(&name, "dr2", true)
		.unwrap();
	let source = builder.build().unwrap();
	let instance = source.trait_for("a", &key("catalog-sami")).unwrap();
	assert_eq!(instance.key(), &key("catalog-sami:dr2(v1)"));
}

#[test]
fn test_fallback_reaches_pattern_registration() {
	struct Anything;
	impl Provider for Anything {}

	let def = ProviderDef::builder("Legacy", "spectrum", |_init: &TraitInit| {
		CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
		Ok(Anything)
	})
	.attribute("value", ValueKind::INT, |_: &Anything| Ok(Value::from(1_i64)))
	.build()
	.unwrap();
	let mut builder = DataSource::builder();
	builder.provider(Arc::new(def)).unwrap();
	let source = builder.build().unwrap();

	assert!(source.trait_for("x", &key("spectrum-blue:dr1(v1)")).is_err());
	let instance = source
		.trait_for_with_fallback("x", &key("spectrum-blue:dr1(v1)"))
		.unwrap();
	assert_eq!(instance.key(), &key("spectrum"));
	assert_eq!(instance.get("value").unwrap(), Value::Int(1));
	assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_column_value_through_source() {
	let mut builder = DataSource::builder();
	builder
		.column(Arc::new(FnColumn::new(
			ColumnId::full("sami", "catalog", "z", Timestamp::At(5)).unwrap(),
			|_| Ok(Value::from(0.1)),
		)))
		.unwrap()
		.objects(["a"]);
	let source = builder.build().unwrap();
	let latest = ColumnId::full("sami", "catalog", "z", Timestamp::Latest).unwrap();
	assert_eq!(source.column_value(&latest, "a").unwrap(), Value::Float(0.1));
	assert!(source.column_value(&latest, "b").unwrap_err().is_not_available());
}

#[test]
fn test_short_column_associated_through_builder() {
	let mut builder = DataSource::builder();
	let redshift = FnColumn::new(ColumnId::short("catalog", "z").unwrap(), |_| Ok(Value::from(0.2)))
		.with_timestamp(Timestamp::At(11));
	builder.associate_column("sami", Arc::new(redshift)).unwrap();
	let source = builder.build().unwrap();
	let stored = ColumnId::full("sami", "catalog", "z", Timestamp::At(11)).unwrap();
	assert_eq!(source.columns().ids().collect::<Vec<_>>(), vec![&stored]);
	let latest = ColumnId::full("sami", "catalog", "z", Timestamp::Latest).unwrap();
	assert_eq!(source.column_value(&latest, "a").unwrap(), Value::Float(0.2));
}
