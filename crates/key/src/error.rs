use thiserror::Error;

/// Errors raised while parsing or validating keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
	/// Input does not follow the key grammar.
	#[error("invalid key format {input:?} at position {position}: {message}")]
	InvalidKeyFormat {
		/// The rejected input.
		input: String,
		/// Byte offset where parsing stopped.
		position: usize,
		/// Human-readable description of the problem.
		message: String,
	},

	/// Input is not a short (`kind:name`) or full (`source:kind:name:timestamp`) column id.
	#[error("invalid column id {input:?}: {message}")]
	InvalidColumnId {
		/// The rejected input.
		input: String,
		/// Human-readable description of the problem.
		message: String,
	},
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
