use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{KeyError, Result};
use crate::trait_key::TraitKey;

/// Ordered sequence of keys addressing nested data, rendered joined by `/`.
///
/// The empty path renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath(SmallVec<[TraitKey; 2]>);

impl KeyPath {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a new path with `key` appended.
	pub fn join(&self, key: TraitKey) -> Self {
		let mut keys = self.0.clone();
		keys.push(key);
		Self(keys)
	}

	pub fn keys(&self) -> &[TraitKey] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The final key, if any.
	pub fn leaf(&self) -> Option<&TraitKey> {
		self.0.last()
	}

	pub fn parse(input: &str) -> Result<Self> {
		if input.is_empty() {
			return Ok(Self::new());
		}
		let mut offset = 0;
		let mut keys = SmallVec::new();
		for segment in input.split('/') {
			let key = TraitKey::parse(segment).map_err(|err| match err {
				KeyError::InvalidKeyFormat { position, message, .. } => KeyError::InvalidKeyFormat {
					input: input.to_string(),
					position: offset + position,
					message,
				},
				other => other,
			})?;
			keys.push(key);
			offset += segment.len() + 1;
		}
		Ok(Self(keys))
	}
}

impl From<TraitKey> for KeyPath {
	fn from(key: TraitKey) -> Self {
		Self(SmallVec::from_iter([key]))
	}
}

impl FromIterator<TraitKey> for KeyPath {
	fn from_iter<I: IntoIterator<Item = TraitKey>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl fmt::Display for KeyPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, key) in self.0.iter().enumerate() {
			if i > 0 {
				f.write_str("/")?;
			}
			write!(f, "{key}")?;
		}
		Ok(())
	}
}

impl FromStr for KeyPath {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}
