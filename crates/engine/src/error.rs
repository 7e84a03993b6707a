use std::error::Error as StdError;
use std::sync::Arc;

use orrery_key::KeyError;
use orrery_registry::RegistryError;

use crate::config::ConfigError;
use crate::value::ValueKind;

/// Boxed cause carried by [`EngineError::LoadError`].
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// Engine errors.
///
/// [`EngineError::DataNotAvailable`] is the one expected condition: cache
/// layers report it to let the chain fall through, and loaders report it when
/// the underlying data is absent for an object. Everything else is a real
/// failure; failures raised inside provider code reach the caller as
/// [`EngineError::LoadError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
	#[error(transparent)]
	Key(#[from] KeyError),

	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error("data not available: {0}")]
	DataNotAvailable(String),

	/// `release` without a matching `acquire`. A bug in the caller.
	#[error("unbalanced release of {0}: resource is not open")]
	UnbalancedRelease(String),

	/// A loader, constructor or resource hook failed.
	#[error("load error in {context}: {cause}")]
	LoadError {
		context: String,
		#[source]
		cause: Cause,
	},

	#[error("{provider} has no attribute {attribute:?}")]
	UnknownAttribute { provider: String, attribute: String },

	#[error("{provider} declares attribute {attribute:?} more than once")]
	DuplicateAttribute { provider: String, attribute: String },

	/// A key path with no keys was given where a provider is addressed.
	#[error("empty key path")]
	EmptyPath,

	/// A full column id was registered twice.
	#[error("duplicate registration for column {column}")]
	DuplicateColumn { column: String },

	/// A loader returned a value outside the attribute's declared kind.
	#[error("attribute {attribute:?} is declared {expected} but the loader returned {found}")]
	TypeMismatch {
		attribute: String,
		expected: ValueKind,
		found: String,
	},

	/// A cache layer failed for a reason other than missing data.
	#[error("cache layer {layer}: {message}")]
	Cache { layer: String, message: String },

	#[error(transparent)]
	Config(Arc<ConfigError>),
}

impl EngineError {
	pub fn not_available(what: impl Into<String>) -> Self {
		EngineError::DataNotAvailable(what.into())
	}

	pub fn is_not_available(&self) -> bool {
		matches!(self, EngineError::DataNotAvailable(_))
	}
}

impl From<ConfigError> for EngineError {
	fn from(err: ConfigError) -> Self {
		EngineError::Config(Arc::new(err))
	}
}

/// Failure reported by provider code: constructors, loaders, hooks and columns.
///
/// Any error type converts into the `Other` arm with `?`. Report missing data
/// with [`LoadFailure::not_available`] so it is not treated as a load error.
#[derive(Debug)]
pub enum LoadFailure {
	DataNotAvailable(String),
	Other(Box<dyn StdError + Send + Sync>),
}

impl LoadFailure {
	pub fn not_available(what: impl Into<String>) -> Self {
		LoadFailure::DataNotAvailable(what.into())
	}

	/// An ad-hoc failure with only a message.
	pub fn msg(message: impl Into<String>) -> Self {
		let message: String = message.into();
		LoadFailure::Other(message.into())
	}

	/// Converts into an [`EngineError`], wrapping real failures as
	/// [`EngineError::LoadError`] with `context`.
	///
	/// An [`EngineError::DataNotAvailable`] raised inside provider code stays
	/// `DataNotAvailable`; every other engine error is wrapped like any cause.
	pub fn into_engine(self, context: impl FnOnce() -> String) -> EngineError {
		match self {
			LoadFailure::DataNotAvailable(what) => EngineError::DataNotAvailable(what),
			LoadFailure::Other(cause) => {
				let cause: Cause = match cause.downcast::<EngineError>() {
					Ok(engine) => match *engine {
						EngineError::DataNotAvailable(what) => return EngineError::DataNotAvailable(what),
						engine => Arc::new(engine) as Cause,
					},
					Err(cause) => Arc::from(cause),
				};
				EngineError::LoadError {
					context: context(),
					cause,
				}
			}
		}
	}
}

impl<E> From<E> for LoadFailure
where
	E: StdError + Send + Sync + 'static,
{
	fn from(err: E) -> Self {
		LoadFailure::Other(Box::new(err))
	}
}

pub type Result<T> = std::result::Result<T, EngineError>;
