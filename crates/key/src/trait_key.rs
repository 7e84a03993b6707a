use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};
use crate::parser::{self, ANY_TYPE};

#[cfg(test)]
mod tests;

/// One of the four positions of a [`TraitKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
	Type,
	Qualifier,
	Branch,
	Version,
}

impl KeyField {
	/// All fields in key order.
	pub const ALL: [KeyField; 4] = [
		KeyField::Type,
		KeyField::Qualifier,
		KeyField::Branch,
		KeyField::Version,
	];

	/// Human-readable field name used in diagnostics.
	pub fn label(self) -> &'static str {
		match self {
			KeyField::Type => "trait type",
			KeyField::Qualifier => "qualifier",
			KeyField::Branch => "branch",
			KeyField::Version => "version",
		}
	}

	/// Checks `value` against this field's grammar.
	pub fn validate(self, value: &str) -> Result<()> {
		parser::validate_field(self, value)
	}
}

impl fmt::Display for KeyField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Structured `(type, qualifier, branch, version)` identifier.
///
/// Any unset field makes the key a pattern; a key with all four fields set is
/// concrete. Keys are immutable: every "setter" returns a new key.
///
/// The canonical string form is `type-qualifier:branch(version)`, with absent
/// parts omitted and an unset type written as `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraitKey {
	trait_type: Option<String>,
	qualifier: Option<String>,
	branch: Option<String>,
	version: Option<String>,
}

impl TraitKey {
	/// Creates a pattern key with only the type set.
	pub fn new(trait_type: &str) -> Result<Self> {
		Self::from_fields(Some(trait_type), None, None, None)
	}

	/// Creates a key from optional field values, validating each one.
	pub fn from_fields(
		trait_type: Option<&str>,
		qualifier: Option<&str>,
		branch: Option<&str>,
		version: Option<&str>,
	) -> Result<Self> {
		let mut key = Self::from_validated(None, None, None, None);
		for (field, value) in KeyField::ALL.into_iter().zip([trait_type, qualifier, branch, version]) {
			if let Some(value) = value {
				parser::validate_field(field, value)?;
				*key.slot_mut(field) = Some(value.to_string());
			}
		}
		Ok(key)
	}

	pub(crate) fn from_validated(
		trait_type: Option<String>,
		qualifier: Option<String>,
		branch: Option<String>,
		version: Option<String>,
	) -> Self {
		Self {
			trait_type,
			qualifier,
			branch,
			version,
		}
	}

	/// Parses the canonical `type-qualifier:branch(version)` form.
	pub fn parse(input: &str) -> Result<Self> {
		parser::parse_key(input)
	}

	/// Parses the hyphen-only `type-qualifier-branch-version` form.
	///
	/// Empty segments leave the corresponding field unset, so
	/// `image-r--v2` has no branch.
	pub fn parse_hyphenated(input: &str) -> Result<Self> {
		parser::parse_hyphenated(input)
	}

	/// Renders the hyphen-only form accepted by [`TraitKey::parse_hyphenated`].
	pub fn to_hyphen_string(&self) -> String {
		let mut segments: Vec<&str> = vec![self.trait_type.as_deref().unwrap_or("*")];
		segments.extend(
			[&self.qualifier, &self.branch, &self.version]
				.into_iter()
				.map(|field| field.as_deref().unwrap_or("")),
		);
		while segments.len() > 1 && segments.last().is_some_and(|s| s.is_empty()) {
			segments.pop();
		}
		segments.join("-")
	}

	pub fn trait_type(&self) -> Option<&str> {
		self.trait_type.as_deref()
	}

	pub fn qualifier(&self) -> Option<&str> {
		self.qualifier.as_deref()
	}

	pub fn branch(&self) -> Option<&str> {
		self.branch.as_deref()
	}

	pub fn version(&self) -> Option<&str> {
		self.version.as_deref()
	}

	/// Returns the value of one field.
	pub fn field(&self, field: KeyField) -> Option<&str> {
		match field {
			KeyField::Type => self.trait_type(),
			KeyField::Qualifier => self.qualifier(),
			KeyField::Branch => self.branch(),
			KeyField::Version => self.version(),
		}
	}

	fn slot_mut(&mut self, field: KeyField) -> &mut Option<String> {
		match field {
			KeyField::Type => &mut self.trait_type,
			KeyField::Qualifier => &mut self.qualifier,
			KeyField::Branch => &mut self.branch,
			KeyField::Version => &mut self.version,
		}
	}

	/// Returns a copy with `field` set to `value` (or cleared for `None`).
	///
	/// # Errors
	///
	/// Returns [`KeyError::InvalidKeyFormat`] if `value` does not match the
	/// field's grammar.
	pub fn with_field_replaced(&self, field: KeyField, value: Option<&str>) -> Result<Self> {
		if let Some(value) = value {
			parser::validate_field(field, value)?;
		}
		let mut key = self.clone();
		*key.slot_mut(field) = value.map(str::to_string);
		Ok(key)
	}

	/// Returns a copy with the given fields cleared.
	pub fn without(&self, fields: &[KeyField]) -> Self {
		let mut key = self.clone();
		for &field in fields {
			*key.slot_mut(field) = None;
		}
		key
	}

	/// Returns `true` iff every field is set.
	pub fn is_concrete(&self) -> bool {
		KeyField::ALL.into_iter().all(|field| self.field(field).is_some())
	}

	/// Returns `true` if any field is unset.
	pub fn is_pattern(&self) -> bool {
		!self.is_concrete()
	}

	/// The `(type, qualifier)` pair used to look up defaults.
	///
	/// `None` when the type is unset.
	pub fn name(&self) -> Option<TraitName> {
		Some(TraitName {
			trait_type: self.trait_type.clone()?,
			qualifier: self.qualifier.clone(),
		})
	}
}

impl fmt::Display for TraitKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.trait_type {
			Some(trait_type) => f.write_str(trait_type)?,
			None => write!(f, "{ANY_TYPE}")?,
		}
		if let Some(qualifier) = &self.qualifier {
			write!(f, "-{qualifier}")?;
		}
		if let Some(branch) = &self.branch {
			write!(f, ":{branch}")?;
		}
		if let Some(version) = &self.version {
			write!(f, "({version})")?;
		}
		Ok(())
	}
}

impl FromStr for TraitKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl TryFrom<String> for TraitKey {
	type Error = KeyError;

	fn try_from(s: String) -> Result<Self> {
		Self::parse(&s)
	}
}

impl From<TraitKey> for String {
	fn from(key: TraitKey) -> Self {
		key.to_string()
	}
}

/// The `(type, qualifier)` part of a key, rendered `type-qualifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraitName {
	trait_type: String,
	qualifier: Option<String>,
}

impl TraitName {
	pub fn new(trait_type: &str, qualifier: Option<&str>) -> Result<Self> {
		TraitKey::from_fields(Some(trait_type), qualifier, None, None).map(|key| Self {
			trait_type: trait_type.to_string(),
			qualifier: key.qualifier,
		})
	}

	pub fn trait_type(&self) -> &str {
		&self.trait_type
	}

	pub fn qualifier(&self) -> Option<&str> {
		self.qualifier.as_deref()
	}

	/// Builds the key with this name and the given provenance.
	pub fn key(&self, branch: Option<&str>, version: Option<&str>) -> Result<TraitKey> {
		TraitKey::from_fields(Some(&self.trait_type), self.qualifier(), branch, version)
	}
}

impl fmt::Display for TraitName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.trait_type)?;
		if let Some(qualifier) = &self.qualifier {
			write!(f, "-{qualifier}")?;
		}
		Ok(())
	}
}

impl FromStr for TraitName {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		let key = TraitKey::parse(s)?;
		if key.branch.is_some() || key.version.is_some() {
			return Err(KeyError::InvalidKeyFormat {
				input: s.to_string(),
				position: s.find([':', '(']).unwrap_or(s.len()),
				message: "a trait name carries no branch or version".to_string(),
			});
		}
		key.name().ok_or_else(|| KeyError::InvalidKeyFormat {
			input: s.to_string(),
			position: 0,
			message: "a trait name needs a type".to_string(),
		})
	}
}
