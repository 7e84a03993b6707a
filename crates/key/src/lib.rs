//! Structured identifiers for the trait engine.
//!
//! A [`TraitKey`] names one realisation of a trait: its type, an optional
//! qualifier, and the two provenance dimensions (branch and version). Keys with
//! missing fields act as lookup patterns; keys with every field set are
//! concrete and can be used for exact registry lookups.
//!
//! # Types
//!
//! - [`TraitKey`] - `type-qualifier:branch(version)`
//! - [`TraitName`] - the `(type, qualifier)` pair used to look up defaults
//! - [`KeyPath`] - `/`-separated sequence of keys addressing nested data
//! - [`ColumnId`] - `source:kind:name:timestamp` column identifier
//!
//! All parsing goes through a small hand-written recursive-descent parser and
//! fails with [`KeyError::InvalidKeyFormat`] carrying the byte offset of the
//! offending character.

mod column_id;
mod error;
mod parser;
mod path;
mod trait_key;

pub use column_id::{ColumnId, Timestamp};
pub use error::{KeyError, Result};
pub use path::KeyPath;
pub use trait_key::{KeyField, TraitKey, TraitName};
