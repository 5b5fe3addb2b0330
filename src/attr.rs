//! Attribute values attached to a store.
//!
//! Stores hand out attributes either as a single scalar or as a list of scalars. The merge only
//! ever deals in lists, so values are normalized with [`AttrValue::into_list`] as soon as they
//! are read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Single attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
	/// Boolean flag.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Unsigned integer beyond the range of [`Self::Int`].
	UInt(u64),
	/// Floating-point number.
	Float(f64),
	/// UTF-8 text.
	Str(String),
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool(value) => write!(f, "{value}"),
			Self::Int(value) => write!(f, "{value}"),
			Self::UInt(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value}"),
			Self::Str(value) => write!(f, "{value:?}"),
		}
	}
}

impl From<bool> for Scalar {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for Scalar {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<u64> for Scalar {
	fn from(value: u64) -> Self {
		i64::try_from(value).map_or(Self::UInt(value), Self::Int)
	}
}

impl From<f64> for Scalar {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Scalar {
	fn from(value: &str) -> Self {
		Self::Str(value.to_string())
	}
}

impl From<String> for Scalar {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}

/// Attribute as found in an input store, either a bare scalar or a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
	/// List of scalars.
	List(Vec<Scalar>),
	/// Bare scalar, treated as a singleton list.
	Scalar(Scalar),
}

impl AttrValue {
	/// Normalizes into list form.
	pub fn into_list(self) -> Vec<Scalar> {
		match self {
			Self::List(values) => values,
			Self::Scalar(value) => vec![value],
		}
	}
}

impl From<Scalar> for AttrValue {
	fn from(value: Scalar) -> Self {
		Self::Scalar(value)
	}
}

impl From<Vec<Scalar>> for AttrValue {
	fn from(values: Vec<Scalar>) -> Self {
		Self::List(values)
	}
}
