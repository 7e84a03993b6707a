//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty document is valid.
//!
//! ```toml
//! trait_cache_capacity = 20
//! memory_cache_capacity = 4096
//! eager = false
//! ```

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;


/// Default number of realised providers kept per data source.
pub const DEFAULT_TRAIT_CACHE_CAPACITY: usize = 20;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A field holds a value outside its allowed range.
	#[error("invalid value for {field}: {message}")]
	Invalid {
		field: &'static str,
		message: String,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	/// LRU capacity for realised providers, keyed by object and key.
	pub trait_cache_capacity: usize,
	/// Entry bound for the built-in memory cache layer. `None` is unbounded.
	pub memory_cache_capacity: Option<usize>,
	/// Realise every attribute of a provider as soon as it is constructed.
	pub eager: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			trait_cache_capacity: DEFAULT_TRAIT_CACHE_CAPACITY,
			memory_cache_capacity: None,
			eager: false,
		}
	}
}

impl EngineConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: EngineConfig = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		self.trait_cache_capacity()?;
		if self.memory_cache_capacity == Some(0) {
			return Err(ConfigError::Invalid {
				field: "memory_cache_capacity",
				message: "must be at least 1; omit it for an unbounded cache".to_string(),
			});
		}
		Ok(())
	}

	pub(crate) fn trait_cache_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
		NonZeroUsize::new(self.trait_cache_capacity).ok_or_else(|| ConfigError::Invalid {
			field: "trait_cache_capacity",
			message: "must be at least 1".to_string(),
		})
	}
}
