use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};


const LATEST: &str = "latest";

/// Column timestamp: a concrete instant or the `latest` marker.
///
/// `Latest` is resolved at lookup time to the greatest concrete timestamp of
/// the columns sharing source, kind and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timestamp {
	Latest,
	At(u64),
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Timestamp::Latest => f.write_str(LATEST),
			Timestamp::At(ts) => write!(f, "{ts}"),
		}
	}
}

impl FromStr for Timestamp {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, String> {
		if s == LATEST {
			return Ok(Timestamp::Latest);
		}
		s.parse::<u64>()
			.map(Timestamp::At)
			.map_err(|_| format!("timestamp must be an integer or '{LATEST}', found {s:?}"))
	}
}

/// Identifier of one column of data.
///
/// The short form `kind:name` is used when declaring a column before it is
/// associated with a source; [`ColumnId::associate`] produces the full
/// `source:kind:name:timestamp` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnId {
	source: Option<String>,
	kind: String,
	name: String,
	timestamp: Option<Timestamp>,
}

impl ColumnId {
	/// Creates a short id. Short names may not contain `:`.
	pub fn short(kind: &str, name: &str) -> Result<Self> {
		check_segment(kind, "kind", kind)?;
		check_segment(name, "name", name)?;
		Ok(Self {
			source: None,
			kind: kind.to_string(),
			name: name.to_string(),
			timestamp: None,
		})
	}

	/// Creates a full id.
	pub fn full(source: &str, kind: &str, name: &str, timestamp: Timestamp) -> Result<Self> {
		check_segment(source, "source", source)?;
		check_segment(kind, "kind", kind)?;
		check_name(name, name)?;
		Ok(Self {
			source: Some(source.to_string()),
			kind: kind.to_string(),
			name: name.to_string(),
			timestamp: Some(timestamp),
		})
	}

	/// Binds a short id to a source and timestamp. Already-full ids are
	/// rebound.
	pub fn associate(&self, source: &str, timestamp: Timestamp) -> Result<Self> {
		Self::full(source, &self.kind, &self.name, timestamp)
	}

	pub fn parse(input: &str) -> Result<Self> {
		let parts: Vec<&str> = input.split(':').collect();
		match parts.as_slice() {
			[kind, name] => {
				check_segment(kind, "kind", input)?;
				check_segment(name, "name", input)?;
				Ok(Self {
					source: None,
					kind: kind.to_string(),
					name: name.to_string(),
					timestamp: None,
				})
			}
			[source, kind, name @ .., timestamp] if !name.is_empty() => {
				check_segment(source, "source", input)?;
				check_segment(kind, "kind", input)?;
				let name = name.join(":");
				check_name(&name, input)?;
				let timestamp = timestamp.parse::<Timestamp>().map_err(|message| KeyError::InvalidColumnId {
					input: input.to_string(),
					message,
				})?;
				Ok(Self {
					source: Some(source.to_string()),
					kind: kind.to_string(),
					name,
					timestamp: Some(timestamp),
				})
			}
			_ => Err(KeyError::InvalidColumnId {
				input: input.to_string(),
				message: "expected 'kind:name' or 'source:kind:name:timestamp'".to_string(),
			}),
		}
	}

	pub fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn timestamp(&self) -> Option<Timestamp> {
		self.timestamp
	}

	/// Returns `true` for the four-part form.
	pub fn is_full(&self) -> bool {
		self.source.is_some()
	}

	/// Returns `true` if the timestamp is the `latest` marker.
	pub fn is_latest(&self) -> bool {
		self.timestamp == Some(Timestamp::Latest)
	}

	/// The `(source, kind, name)` triple shared by every timestamp of a column.
	pub fn series(&self) -> (Option<&str>, &str, &str) {
		(self.source(), &self.kind, &self.name)
	}
}

fn check_segment(segment: &str, what: &str, input: &str) -> Result<()> {
	if segment.is_empty() || segment.contains(':') {
		return Err(KeyError::InvalidColumnId {
			input: input.to_string(),
			message: format!("{what} must be non-empty and contain no ':'"),
		});
	}
	Ok(())
}

fn check_name(name: &str, input: &str) -> Result<()> {
	if name.is_empty() {
		return Err(KeyError::InvalidColumnId {
			input: input.to_string(),
			message: "name must be non-empty".to_string(),
		});
	}
	Ok(())
}

impl fmt::Display for ColumnId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.source, self.timestamp) {
			(Some(source), Some(timestamp)) => {
				write!(f, "{source}:{}:{}:{timestamp}", self.kind, self.name)
			}
			_ => write!(f, "{}:{}", self.kind, self.name),
		}
	}
}

impl FromStr for ColumnId {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl TryFrom<String> for ColumnId {
	type Error = KeyError;

	fn try_from(s: String) -> Result<Self> {
		Self::parse(&s)
	}
}

impl From<ColumnId> for String {
	fn from(id: ColumnId) -> Self {
		id.to_string()
	}
}
