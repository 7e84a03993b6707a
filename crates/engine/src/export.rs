//! Host-facing serialisation of resolved values.
//!
//! The engine knows nothing about response formats. These hooks hand the host
//! a compact binary encoding, a JSON document or flat text rows that it can
//! turn into CSV, tables or files.

use crate::value::{ArrayValue, Value};

/// Errors raised while exporting a value.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
	#[error("binary encoding failed: {0}")]
	Binary(#[from] postcard::Error),

	#[error("json encoding failed: {0}")]
	Json(#[from] serde_json::Error),
}

impl Value {
	/// Compact binary encoding.
	pub fn as_bytes(&self) -> Result<Vec<u8>, ExportError> {
		Ok(postcard::to_allocvec(self)?)
	}

	/// Decodes a value produced by [`Value::as_bytes`].
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExportError> {
		Ok(postcard::from_bytes(bytes)?)
	}

	pub fn as_json(&self) -> Result<serde_json::Value, ExportError> {
		Ok(serde_json::to_value(self)?)
	}

	/// Flattens the value into text rows, header first.
	///
	/// Scalars yield a single `value` column. Arrays yield one row per element
	/// in row-major order, prefixed by its index along each axis
	/// (`axis_0`, `axis_1`, ...).
	pub fn as_table_rows(&self) -> Vec<Vec<String>> {
		match self {
			Value::String(v) => vec![vec!["value".to_string()], vec![v.clone()]],
			Value::Int(v) => vec![vec!["value".to_string()], vec![v.to_string()]],
			Value::Float(v) => vec![vec!["value".to_string()], vec![v.to_string()]],
			Value::Array(array) => array_rows(array),
		}
	}
}

fn array_rows(array: &ArrayValue) -> Vec<Vec<String>> {
	let shape = array.shape();
	let mut header: Vec<String> = (0..shape.len()).map(|axis| format!("axis_{axis}")).collect();
	header.push("value".to_string());

	let mut rows = Vec::with_capacity(array.data().len() + 1);
	rows.push(header);
	let mut index = vec![0usize; shape.len()];
	for flat in 0..array.data().len() {
		let Some(value) = array.data().render(flat) else { break };
		let mut row: Vec<String> = index.iter().map(ToString::to_string).collect();
		row.push(value);
		rows.push(row);
		// Advance the row-major counter.
		for axis in (0..shape.len()).rev() {
			index[axis] += 1;
			if index[axis] < shape[axis] {
				break;
			}
			index[axis] = 0;
		}
	}
	rows
}
