use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;


/// Element type of scalar and array values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
	String,
	Int,
	Float,
}

impl ElementType {
	pub fn name(self) -> &'static str {
		match self {
			ElementType::String => "string",
			ElementType::Int => "int",
			ElementType::Float => "float",
		}
	}

	fn from_name(name: &str) -> Option<Self> {
		match name {
			"string" => Some(ElementType::String),
			"int" => Some(ElementType::Int),
			"float" => Some(ElementType::Float),
			_ => None,
		}
	}
}

/// Declared category of an attribute.
///
/// Written `string`, `int`, `float` for scalars and `<element>.array.<N>` for
/// N-dimensional arrays, e.g. `float.array.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
	Scalar(ElementType),
	Array { element: ElementType, ndim: u8 },
}

impl ValueKind {
	pub const STRING: ValueKind = ValueKind::Scalar(ElementType::String);
	pub const INT: ValueKind = ValueKind::Scalar(ElementType::Int);
	pub const FLOAT: ValueKind = ValueKind::Scalar(ElementType::Float);

	pub fn array(element: ElementType, ndim: u8) -> Self {
		ValueKind::Array { element, ndim }
	}

	pub fn element(self) -> ElementType {
		match self {
			ValueKind::Scalar(element) | ValueKind::Array { element, .. } => element,
		}
	}

	/// Scalar kinds are the ones that fit in a catalog column.
	pub fn is_catalog(self) -> bool {
		matches!(self, ValueKind::Scalar(_))
	}
}

impl fmt::Display for ValueKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValueKind::Scalar(element) => f.write_str(element.name()),
			ValueKind::Array { element, ndim } => write!(f, "{}.array.{ndim}", element.name()),
		}
	}
}

impl FromStr for ValueKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, String> {
		let invalid = || format!("invalid value kind {s:?}");
		match s.split('.').collect::<Vec<_>>().as_slice() {
			[element] => ElementType::from_name(element).map(ValueKind::Scalar).ok_or_else(invalid),
			[element, "array", ndim] => {
				let element = ElementType::from_name(element).ok_or_else(invalid)?;
				let ndim = ndim.parse::<u8>().ok().filter(|n| *n > 0).ok_or_else(invalid)?;
				Ok(ValueKind::Array { element, ndim })
			}
			_ => Err(invalid()),
		}
	}
}

/// Typed element storage of an [`ArrayValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
	String(Vec<String>),
	Int(Vec<i64>),
	Float(Vec<f64>),
}

impl ArrayData {
	pub fn len(&self) -> usize {
		match self {
			ArrayData::String(v) => v.len(),
			ArrayData::Int(v) => v.len(),
			ArrayData::Float(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn element(&self) -> ElementType {
		match self {
			ArrayData::String(_) => ElementType::String,
			ArrayData::Int(_) => ElementType::Int,
			ArrayData::Float(_) => ElementType::Float,
		}
	}

	/// Element `index` rendered as text.
	pub(crate) fn render(&self, index: usize) -> Option<String> {
		match self {
			ArrayData::String(v) => v.get(index).cloned(),
			ArrayData::Int(v) => v.get(index).map(ToString::to_string),
			ArrayData::Float(v) => v.get(index).map(ToString::to_string),
		}
	}
}

/// Row-major N-dimensional array.
///
/// Deserialisation goes through [`ArrayValue::new`], so decoded arrays carry
/// the same shape guarantee as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArray")]
pub struct ArrayValue {
	shape: SmallVec<[usize; 4]>,
	data: ArrayData,
}

#[derive(Deserialize)]
struct RawArray {
	shape: SmallVec<[usize; 4]>,
	data: ArrayData,
}

impl TryFrom<RawArray> for ArrayValue {
	type Error = ShapeError;

	fn try_from(raw: RawArray) -> Result<Self, ShapeError> {
		Self::new(raw.shape, raw.data)
	}
}

impl ArrayValue {
	/// Creates an array, checking that `shape` covers exactly `data`.
	pub fn new(shape: impl IntoIterator<Item = usize>, data: ArrayData) -> Result<Self, ShapeError> {
		let shape: SmallVec<[usize; 4]> = shape.into_iter().collect();
		let expected: usize = shape.iter().product();
		if shape.is_empty() || expected != data.len() {
			return Err(ShapeError {
				shape: shape.to_vec(),
				found: data.len(),
			});
		}
		Ok(Self { shape, data })
	}

	/// One-dimensional array over `data`.
	pub fn vector(data: ArrayData) -> Self {
		Self {
			shape: SmallVec::from_iter([data.len()]),
			data,
		}
	}

	pub fn shape(&self) -> &[usize] {
		&self.shape
	}

	pub fn ndim(&self) -> usize {
		self.shape.len()
	}

	pub fn data(&self) -> &ArrayData {
		&self.data
	}

	pub fn kind(&self) -> ValueKind {
		ValueKind::Array {
			element: self.data.element(),
			ndim: u8::try_from(self.ndim()).unwrap_or(u8::MAX),
		}
	}
}

/// Array shape does not match the number of elements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shape {shape:?} does not fit {found} elements")]
pub struct ShapeError {
	pub shape: Vec<usize>,
	pub found: usize,
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	String(String),
	Int(i64),
	Float(f64),
	Array(ArrayValue),
}

impl Value {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the float value; integers widen.
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(v) => Some(*v),
			Value::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&ArrayValue> {
		match self {
			Value::Array(v) => Some(v),
			_ => None,
		}
	}

	pub fn kind(&self) -> ValueKind {
		match self {
			Value::String(_) => ValueKind::STRING,
			Value::Int(_) => ValueKind::INT,
			Value::Float(_) => ValueKind::FLOAT,
			Value::Array(array) => array.kind(),
		}
	}

	/// Returns true if this value belongs to `kind`.
	pub fn matches_kind(&self, kind: ValueKind) -> bool {
		self.kind() == kind
	}

	/// The rendered kind of this value, for diagnostics.
	pub fn type_name(&self) -> String {
		self.kind().to_string()
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<ArrayValue> for Value {
	fn from(v: ArrayValue) -> Self {
		Value::Array(v)
	}
}

impl From<Vec<f64>> for Value {
	fn from(v: Vec<f64>) -> Self {
		Value::Array(ArrayValue::vector(ArrayData::Float(v)))
	}
}

impl From<Vec<i64>> for Value {
	fn from(v: Vec<i64>) -> Self {
		Value::Array(ArrayValue::vector(ArrayData::Int(v)))
	}
}
