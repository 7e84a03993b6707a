//! Orthogonal capability interfaces a realised provider may offer.

use crate::error::Result;
use crate::value::Value;

/// A capability derived from a provider declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	/// The `value` attribute is an array with a shape.
	Shape,
	/// The provider declares a physical unit.
	Unit,
	/// The provider declares a `variance` attribute.
	Variance,
}

bitflags::bitflags! {
	/// A set of provider capabilities.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Capabilities: u8 {
		const SHAPE = 1 << 0;
		const UNIT = 1 << 1;
		const VARIANCE = 1 << 2;
	}
}

impl Capability {
	/// Returns the bitflag for this capability.
	pub const fn as_set(self) -> Capabilities {
		match self {
			Self::Shape => Capabilities::SHAPE,
			Self::Unit => Capabilities::UNIT,
			Self::Variance => Capabilities::VARIANCE,
		}
	}
}

impl From<Capability> for Capabilities {
	fn from(cap: Capability) -> Self {
		cap.as_set()
	}
}

impl FromIterator<Capability> for Capabilities {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		let mut set = Capabilities::empty();
		for cap in iter {
			set |= cap.as_set();
		}
		set
	}
}

/// Array-valued providers.
pub trait HasShape {
	/// Shape of the `value` attribute. Loads it on first use.
	fn shape(&self) -> Result<Vec<usize>>;
}

pub trait HasUnit {
	fn unit(&self) -> &str;
}

/// Providers carrying an uncertainty estimate next to their value.
pub trait HasVariance {
	fn variance(&self) -> Result<Value>;
}
