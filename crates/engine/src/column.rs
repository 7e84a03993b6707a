//! Per-object column data declared by the host.
//!
//! # Role
//!
//! A [`Column`] yields one value per object id. Columns are stored under their
//! full [`ColumnId`]; a lookup with the `latest` timestamp resolves to the
//! most recently produced column of the same source, kind and name.
//!
//! Columns may be declared with a short `kind:name` id and associated with a
//! source on insertion. The stored id then carries the column's own
//! [`Column::timestamp`].
//!
//! # Invariants
//!
//! - Stored ids are full and carry a concrete timestamp.
//! - A full id is stored at most once ([`EngineError::DuplicateColumn`]).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use orrery_key::{ColumnId, KeyError, Timestamp};
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::error::{EngineError, LoadFailure, Result};
use crate::value::Value;


/// A source of one value per object.
pub trait Column: Send + Sync {
	fn id(&self) -> &ColumnId;

	fn get_value(&self, object_id: &str) -> std::result::Result<Value, LoadFailure>;

	/// Time the column data was produced. Defaults to the id's timestamp.
	///
	/// A concrete value here takes precedence over the declared id when the
	/// column is stored.
	fn timestamp(&self) -> Option<Timestamp> {
		self.id().timestamp()
	}
}

type ValueFn = Box<dyn Fn(&str) -> std::result::Result<Value, LoadFailure> + Send + Sync>;

/// A [`Column`] backed by a closure.
pub struct FnColumn {
	id: ColumnId,
	timestamp: Option<Timestamp>,
	get: ValueFn,
}

impl FnColumn {
	pub fn new(
		id: ColumnId,
		get: impl Fn(&str) -> std::result::Result<Value, LoadFailure> + Send + Sync + 'static,
	) -> Self {
		Self {
			id,
			timestamp: None,
			get: Box::new(get),
		}
	}

	/// Overrides the production time reported by [`Column::timestamp`].
	pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
		self.timestamp = Some(timestamp);
		self
	}
}

impl fmt::Debug for FnColumn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnColumn")
			.field("id", &self.id)
			.field("timestamp", &self.timestamp)
			.finish_non_exhaustive()
	}
}

impl Column for FnColumn {
	fn id(&self) -> &ColumnId {
		&self.id
	}

	fn get_value(&self, object_id: &str) -> std::result::Result<Value, LoadFailure> {
		(self.get)(object_id)
	}

	fn timestamp(&self) -> Option<Timestamp> {
		self.timestamp.or_else(|| self.id.timestamp())
	}
}

struct Stored {
	column: Arc<dyn Column>,
	produced: u64,
}

#[derive(Default)]
pub struct ColumnStore {
	columns: IndexMap<ColumnId, Stored, FxBuildHasher>,
}

impl fmt::Debug for ColumnStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.columns.keys().map(ToString::to_string)).finish()
	}
}

impl ColumnStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	pub fn ids(&self) -> impl Iterator<Item = &ColumnId> {
		self.columns.keys()
	}

	/// Stores a column declared with a full id.
	///
	/// A `latest` id is stamped with the column's own [`Column::timestamp`].
	pub fn insert(&mut self, column: Arc<dyn Column>) -> Result<ColumnId> {
		let Some(source) = column.id().source().map(str::to_string) else {
			return Err(invalid(column.id(), "short column ids need a source to associate with"));
		};
		self.associate(&source, column)
	}

	/// Associates a column with `source` and stores it under the resulting
	/// full id.
	///
	/// A declared concrete timestamp is kept in the id; short and `latest` ids
	/// are stamped with [`Column::timestamp`]. `latest` resolution orders by
	/// [`Column::timestamp`] when it is concrete. A column with no concrete
	/// timestamp from either is rejected.
	pub fn associate(&mut self, source: &str, column: Arc<dyn Column>) -> Result<ColumnId> {
		let declared = column.id();
		let produced = match (column.timestamp(), declared.timestamp()) {
			(Some(Timestamp::At(ts)), _) | (_, Some(Timestamp::At(ts))) => ts,
			_ => return Err(invalid(declared, "stored columns need a concrete timestamp")),
		};
		let stamp = match declared.timestamp() {
			Some(Timestamp::At(ts)) => ts,
			_ => produced,
		};
		let id = declared.associate(source, Timestamp::At(stamp))?;
		if self.columns.contains_key(&id) {
			return Err(EngineError::DuplicateColumn { column: id.to_string() });
		}
		debug!(column = %id, declared = %declared, "column registered");
		self.columns.insert(id.clone(), Stored { column, produced });
		Ok(id)
	}

	/// Looks up a column, resolving a `latest` timestamp to the column most
	/// recently produced.
	pub fn get(&self, id: &ColumnId) -> Option<&Arc<dyn Column>> {
		if !id.is_latest() {
			return self.columns.get(id).map(|stored| &stored.column);
		}
		let series = id.series();
		self.columns
			.iter()
			.filter(|(candidate, _)| candidate.series() == series)
			.max_by_key(|(_, stored)| stored.produced)
			.map(|(_, stored)| &stored.column)
	}

	/// Reads `object_id` from the column `id` resolves to.
	pub fn value(&self, id: &ColumnId, object_id: &str) -> Result<Value> {
		let column = self
			.get(id)
			.ok_or_else(|| EngineError::not_available(format!("column {id}")))?;
		column
			.get_value(object_id)
			.map_err(|e| e.into_engine(|| format!("column {id} for {object_id}")))
	}
}

fn invalid(id: &ColumnId, message: &str) -> EngineError {
	KeyError::InvalidColumnId {
		input: id.to_string(),
		message: message.to_string(),
	}
	.into()
}
