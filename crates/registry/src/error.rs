use orrery_key::{KeyError, KeyField, TraitKey};

/// Registry and completion errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	#[error(transparent)]
	Key(#[from] KeyError),

	/// No default branch is recorded for this key-name.
	#[error("no default branch recorded for {name}")]
	UnknownKeyName { name: String },

	/// The branch has no recorded default version.
	#[error("no default version recorded for branch {branch:?} of {name}")]
	UnknownBranch { name: String, branch: String },

	/// Type or qualifier is unset; neither is ever defaulted.
	#[error("key {key} is ambiguous: {missing} is not set")]
	AmbiguousKey { key: TraitKey, missing: KeyField },

	/// A concrete key was already claimed by a different provider.
	#[error("registry {registry}: duplicate registration for {key}: existing={existing} new={new}")]
	DuplicateRegistration {
		registry: &'static str,
		key: TraitKey,
		existing: String,
		new: String,
	},

	/// A default was already set to a different value.
	#[error("conflicting {scope}: {existing:?} is already set, refusing {new:?}")]
	DefaultConflict { scope: String, existing: String, new: String },

	/// No provider is registered for the key.
	#[error("no provider registered for {key}")]
	UnknownKey { key: TraitKey },
}

impl RegistryError {
	/// Prefixes the scope of a [`RegistryError::DefaultConflict`] with the key-name it belongs to.
	pub(crate) fn in_scope(self, name: &impl std::fmt::Display) -> Self {
		match self {
			RegistryError::DefaultConflict { scope, existing, new } => RegistryError::DefaultConflict {
				scope: format!("{scope} of {name}"),
				existing,
				new,
			},
			other => other,
		}
	}
}

pub type Result<T> = std::result::Result<T, RegistryError>;
