use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn key(s: &str) -> TraitKey {
	TraitKey::parse(s).unwrap()
}

#[test]
fn test_parse_full_key() {
	let k = key("spectral_cube-red:releaseA(v1)");
	assert_eq!(k.trait_type(), Some("spectral_cube"));
	assert_eq!(k.qualifier(), Some("red"));
	assert_eq!(k.branch(), Some("releaseA"));
	assert_eq!(k.version(), Some("v1"));
	assert!(k.is_concrete());
}

#[test]
fn test_parse_partial_keys() {
	let k = key("spectral_cube-red");
	assert_eq!(k.branch(), None);
	assert_eq!(k.version(), None);
	assert!(k.is_pattern());

	let k = key("image(1.0)");
	assert_eq!(k.qualifier(), None);
	assert_eq!(k.branch(), None);
	assert_eq!(k.version(), Some("1.0"));

	let k = key("*:dr2");
	assert_eq!(k.trait_type(), None);
	assert_eq!(k.branch(), Some("dr2"));
}

#[test]
fn test_display_canonical() {
	assert_eq!(key("velocity_map-ionized_gas:1_comp(V02)").to_string(), "velocity_map-ionized_gas:1_comp(V02)");
	assert_eq!(TraitKey::from_fields(None, None, None, Some("v1")).unwrap().to_string(), "*(v1)");
}

#[test]
fn test_parse_rejects_leading_digit() {
	let err = TraitKey::parse("1bad-type").unwrap_err();
	match err {
		KeyError::InvalidKeyFormat { input, position, .. } => {
			assert_eq!(input, "1bad-type");
			assert_eq!(position, 0);
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[test]
fn test_parse_rejects_malformed() {
	for input in ["", "type-", "type:", "type(v1", "type()", "type-q:b(v)x", "ty pe", "type-9q", "type:_b"] {
		assert!(
			matches!(TraitKey::parse(input), Err(KeyError::InvalidKeyFormat { .. })),
			"{input:?} should not parse"
		);
	}
}

#[test]
fn test_parse_reports_position() {
	let err = TraitKey::parse("image-red:dr2(v1").unwrap_err();
	assert!(matches!(err, KeyError::InvalidKeyFormat { position: 16, .. }));
}

#[test]
fn test_with_field_replaced() {
	let base = key("image-red");
	let k = base.with_field_replaced(KeyField::Branch, Some("dr3")).unwrap();
	assert_eq!(k.to_string(), "image-red:dr3");
	assert_eq!(base.to_string(), "image-red");

	let cleared = k.with_field_replaced(KeyField::Qualifier, None).unwrap();
	assert_eq!(cleared.to_string(), "image:dr3");
}

#[test]
fn test_with_field_replaced_validates() {
	let base = key("image-red");
	assert!(base.with_field_replaced(KeyField::Qualifier, Some("2red")).is_err());
	assert!(base.with_field_replaced(KeyField::Version, Some("v-1")).is_err());
	assert!(base.with_field_replaced(KeyField::Version, Some("0.1_a")).is_ok());
}

#[test]
fn test_without_clears_fields() {
	let k = key("image-red:dr3(v2)");
	assert_eq!(k.without(&[KeyField::Branch, KeyField::Version]), key("image-red"));
}

#[test]
fn test_equality_includes_unset_fields() {
	assert_ne!(key("image-red"), key("image-red:dr3"));
	assert_eq!(key("image-red:dr3"), TraitKey::from_fields(Some("image"), Some("red"), Some("dr3"), None).unwrap());
}

#[test]
fn test_hyphenated_round_trip() {
	let k = TraitKey::parse_hyphenated("image-red--v2").unwrap();
	assert_eq!(k, key("image-red(v2)"));
	assert_eq!(k.to_hyphen_string(), "image-red--v2");

	let k = key("image-red:dr3(v2)");
	assert_eq!(k.to_hyphen_string(), "image-red-dr3-v2");
	assert_eq!(TraitKey::parse_hyphenated(&k.to_hyphen_string()).unwrap(), k);

	assert_eq!(key("image").to_hyphen_string(), "image");
}

#[test]
fn test_hyphenated_rejects_extra_segments() {
	assert!(TraitKey::parse_hyphenated("image-red-dr3-v2-extra").is_err());
}

#[test]
fn test_name() {
	let name = key("image-red:dr3(v2)").name().unwrap();
	assert_eq!(name.to_string(), "image-red");
	assert_eq!(name, "image-red".parse::<TraitName>().unwrap());
	assert_eq!(key("*:dr3").name(), None);
	assert!("image:dr3".parse::<TraitName>().is_err());
	assert_eq!(name.key(Some("dr3"), Some("v2")).unwrap(), key("image-red:dr3(v2)"));
}

#[test]
fn test_string_conversion_is_canonical() {
	let k = key("image-red:dr3(v2)");
	assert_eq!(String::from(k.clone()), "image-red:dr3(v2)");
	assert_eq!(TraitKey::try_from("image-red:dr3(v2)".to_string()).unwrap(), k);
}

fn ident() -> impl Strategy<Value = String> {
	"[A-Za-z][A-Za-z0-9_]{0,8}"
}

fn token() -> impl Strategy<Value = String> {
	"[A-Za-z0-9][A-Za-z0-9_.]{0,8}"
}

fn any_key() -> impl Strategy<Value = TraitKey> {
	(
		proptest::option::of(ident()),
		proptest::option::of(ident()),
		proptest::option::of(token()),
		proptest::option::of(token()),
	)
		.prop_map(|(t, q, b, v)| TraitKey::from_validated(t, q, b, v))
}

proptest! {
	#[test]
	fn test_canonical_round_trip(k in any_key()) {
		let rendered = k.to_string();
		let parsed = TraitKey::parse(&rendered).unwrap();
		prop_assert_eq!(&parsed, &k);
		prop_assert_eq!(parsed.to_string(), rendered);
	}

	#[test]
	fn test_hyphen_round_trip(k in any_key()) {
		prop_assert_eq!(TraitKey::parse_hyphenated(&k.to_hyphen_string()).unwrap(), k);
	}
}
