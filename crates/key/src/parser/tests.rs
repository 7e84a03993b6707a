use super::*;

#[test]
fn test_validate_field_grammars() {
	assert!(validate_field(KeyField::Type, "spectral_cube").is_ok());
	assert!(validate_field(KeyField::Type, "_cube").is_err());
	assert!(validate_field(KeyField::Qualifier, "red2").is_ok());
	assert!(validate_field(KeyField::Qualifier, "red.2").is_err());
	assert!(validate_field(KeyField::Branch, "1_comp").is_ok());
	assert!(validate_field(KeyField::Version, "1.0.3").is_ok());
	assert!(validate_field(KeyField::Version, ".1").is_err());
	assert!(validate_field(KeyField::Branch, "").is_err());
}

#[test]
fn test_validate_field_reports_offending_position() {
	let err = validate_field(KeyField::Branch, "dr3 final").unwrap_err();
	assert!(matches!(err, KeyError::InvalidKeyFormat { position: 3, .. }));
}

#[test]
fn test_unclosed_version() {
	let err = parse_key("image(v1").unwrap_err();
	match err {
		KeyError::InvalidKeyFormat { message, position, .. } => {
			assert_eq!(position, 8);
			assert!(message.contains("expected ')'"), "{message}");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[test]
fn test_wildcard_type() {
	let key = parse_key("*-red").unwrap();
	assert_eq!(key.trait_type(), None);
	assert_eq!(key.qualifier(), Some("red"));
}

#[test]
fn test_hyphenated_empty_segments() {
	let key = parse_hyphenated("image--dr3").unwrap();
	assert_eq!(key.qualifier(), None);
	assert_eq!(key.branch(), Some("dr3"));
	assert_eq!(key.version(), None);

	let key = parse_hyphenated("image-").unwrap();
	assert_eq!(key.qualifier(), None);
}
