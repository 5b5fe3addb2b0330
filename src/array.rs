//! Dynamically typed N-dimensional arrays.
//!
//! Stores hold arrays of any supported element type. [`ArrayData`] carries one of them behind a
//! tag so the merge can move rows around without knowing the element type at compile time.

use ndarray::{ArrayD, Axis, IxDyn, Slice};
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement, WriteNpyError, WriteNpyExt};
use std::fmt;
use std::io::{Read, Write};

/// Element type of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
	/// `bool`
	Bool,
	/// `i8`
	I8,
	/// `i16`
	I16,
	/// `i32`
	I32,
	/// `i64`
	I64,
	/// `u8`
	U8,
	/// `u16`
	U16,
	/// `u32`
	U32,
	/// `u64`
	U64,
	/// `f32`
	F32,
	/// `f64`
	F64,
}

impl Dtype {
	/// Parses an NPY type descriptor like `<i8` or `|b1`, accepting either byte order.
	pub fn from_descr(descr: &str) -> Option<Self> {
		let code = match descr.as_bytes().first() {
			Some(b'<' | b'>' | b'|' | b'=') => &descr[1..],
			_ => descr,
		};
		Some(match code {
			"b1" => Self::Bool,
			"i1" => Self::I8,
			"i2" => Self::I16,
			"i4" => Self::I32,
			"i8" => Self::I64,
			"u1" => Self::U8,
			"u2" => Self::U16,
			"u4" => Self::U32,
			"u8" => Self::U64,
			"f4" => Self::F32,
			"f8" => Self::F64,
			_ => return None,
		})
	}
	/// Whether index offsets can be added to elements of this type.
	pub fn is_integer(self) -> bool {
		!matches!(self, Self::Bool | Self::F32 | Self::F64)
	}
}

impl fmt::Display for Dtype {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Bool => "bool",
			Self::I8 => "i8",
			Self::I16 => "i16",
			Self::I32 => "i32",
			Self::I64 => "i64",
			Self::U8 => "u8",
			Self::U16 => "u16",
			Self::U32 => "u32",
			Self::U64 => "u64",
			Self::F32 => "f32",
			Self::F64 => "f64",
		})
	}
}

/// Array of any supported element type.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
	/// `bool` elements.
	Bool(ArrayD<bool>),
	/// `i8` elements.
	I8(ArrayD<i8>),
	/// `i16` elements.
	I16(ArrayD<i16>),
	/// `i32` elements.
	I32(ArrayD<i32>),
	/// `i64` elements.
	I64(ArrayD<i64>),
	/// `u8` elements.
	U8(ArrayD<u8>),
	/// `u16` elements.
	U16(ArrayD<u16>),
	/// `u32` elements.
	U32(ArrayD<u32>),
	/// `u64` elements.
	U64(ArrayD<u64>),
	/// `f32` elements.
	F32(ArrayD<f32>),
	/// `f64` elements.
	F64(ArrayD<f64>),
}

macro_rules! each {
	($data:expr, $array:ident => $body:expr) => {
		match $data {
			ArrayData::Bool($array) => $body,
			ArrayData::I8($array) => $body,
			ArrayData::I16($array) => $body,
			ArrayData::I32($array) => $body,
			ArrayData::I64($array) => $body,
			ArrayData::U8($array) => $body,
			ArrayData::U16($array) => $body,
			ArrayData::U32($array) => $body,
			ArrayData::U64($array) => $body,
			ArrayData::F32($array) => $body,
			ArrayData::F64($array) => $body,
		}
	};
}

macro_rules! impl_from {
	($($variant:ident $elem:ty),* $(,)?) => {
		$(
			impl From<ArrayD<$elem>> for ArrayData {
				fn from(array: ArrayD<$elem>) -> Self {
					Self::$variant(array)
				}
			}
		)*
	};
}

impl_from!(
	Bool bool,
	I8 i8,
	I16 i16,
	I32 i32,
	I64 i64,
	U8 u8,
	U16 u16,
	U32 u32,
	U64 u64,
	F32 f32,
	F64 f64,
);

fn zeros<T: Clone + Default>(shape: &[usize]) -> ArrayD<T> {
	ArrayD::default(IxDyn(shape))
}

fn read<T: ReadableElement>(reader: impl Read) -> Result<ArrayD<T>, ReadNpyError> {
	ArrayD::<T>::read_npy(reader)
}

fn shift<T>(array: &ArrayD<T>, offset: u64) -> Option<ArrayD<T>>
where
	T: Copy + Into<i128> + TryFrom<i128>,
{
	let offset = i128::from(offset);
	let mut shifted = array.clone();
	for value in &mut shifted {
		*value = T::try_from((*value).into() + offset).ok()?;
	}
	Some(shifted)
}

fn assign<T: Clone>(dst: &mut ArrayD<T>, start: usize, src: &ArrayD<T>) -> bool {
	if dst.ndim() == 0 || dst.ndim() != src.ndim() || dst.shape()[1..] != src.shape()[1..] {
		return false;
	}
	let stop = start + src.len_of(Axis(0));
	if stop > dst.len_of(Axis(0)) {
		return false;
	}
	dst.slice_axis_mut(Axis(0), Slice::from(start..stop))
		.assign(src);
	true
}

impl ArrayData {
	/// Allocates a default-filled array, all `false` or zero.
	pub fn zeros(dtype: Dtype, shape: &[usize]) -> Self {
		match dtype {
			Dtype::Bool => Self::Bool(zeros(shape)),
			Dtype::I8 => Self::I8(zeros(shape)),
			Dtype::I16 => Self::I16(zeros(shape)),
			Dtype::I32 => Self::I32(zeros(shape)),
			Dtype::I64 => Self::I64(zeros(shape)),
			Dtype::U8 => Self::U8(zeros(shape)),
			Dtype::U16 => Self::U16(zeros(shape)),
			Dtype::U32 => Self::U32(zeros(shape)),
			Dtype::U64 => Self::U64(zeros(shape)),
			Dtype::F32 => Self::F32(zeros(shape)),
			Dtype::F64 => Self::F64(zeros(shape)),
		}
	}
	/// Decodes an NPY stream whose header announced `dtype`.
	pub fn read_npy<R: Read>(dtype: Dtype, reader: R) -> Result<Self, ReadNpyError> {
		Ok(match dtype {
			Dtype::Bool => Self::Bool(read(reader)?),
			Dtype::I8 => Self::I8(read(reader)?),
			Dtype::I16 => Self::I16(read(reader)?),
			Dtype::I32 => Self::I32(read(reader)?),
			Dtype::I64 => Self::I64(read(reader)?),
			Dtype::U8 => Self::U8(read(reader)?),
			Dtype::U16 => Self::U16(read(reader)?),
			Dtype::U32 => Self::U32(read(reader)?),
			Dtype::U64 => Self::U64(read(reader)?),
			Dtype::F32 => Self::F32(read(reader)?),
			Dtype::F64 => Self::F64(read(reader)?),
		})
	}
	/// Encodes as NPY stream.
	pub fn write_npy<W: Write>(&self, writer: W) -> Result<(), WriteNpyError> {
		each!(self, array => array.write_npy(writer))
	}
	/// Element type.
	pub fn dtype(&self) -> Dtype {
		match self {
			Self::Bool(_) => Dtype::Bool,
			Self::I8(_) => Dtype::I8,
			Self::I16(_) => Dtype::I16,
			Self::I32(_) => Dtype::I32,
			Self::I64(_) => Dtype::I64,
			Self::U8(_) => Dtype::U8,
			Self::U16(_) => Dtype::U16,
			Self::U32(_) => Dtype::U32,
			Self::U64(_) => Dtype::U64,
			Self::F32(_) => Dtype::F32,
			Self::F64(_) => Dtype::F64,
		}
	}
	/// Dimensions, the first one being rows.
	pub fn shape(&self) -> &[usize] {
		each!(self, array => array.shape())
	}
	/// Number of rows, `None` for zero-dimensional arrays.
	pub fn rows(&self) -> Option<usize> {
		self.shape().first().copied()
	}
	/// Adds `offset` to every element with checked arithmetic.
	///
	/// Returns `None` for non-integer arrays or if any shifted element leaves the range of the
	/// element type. Empty arrays are returned unchanged whatever the offset.
	pub fn offset(&self, offset: u64) -> Option<Self> {
		match self {
			Self::I8(array) => shift(array, offset).map(Self::I8),
			Self::I16(array) => shift(array, offset).map(Self::I16),
			Self::I32(array) => shift(array, offset).map(Self::I32),
			Self::I64(array) => shift(array, offset).map(Self::I64),
			Self::U8(array) => shift(array, offset).map(Self::U8),
			Self::U16(array) => shift(array, offset).map(Self::U16),
			Self::U32(array) => shift(array, offset).map(Self::U32),
			Self::U64(array) => shift(array, offset).map(Self::U64),
			Self::Bool(_) | Self::F32(_) | Self::F64(_) => None,
		}
	}
	/// Overwrites rows `start..start + rows.rows()` with `rows`.
	///
	/// Returns `false` and leaves `self` untouched if the data-types differ, the trailing
	/// dimensions differ, or the rows run past the end.
	pub fn assign_rows(&mut self, start: usize, rows: &Self) -> bool {
		match (self, rows) {
			(Self::Bool(dst), Self::Bool(src)) => assign(dst, start, src),
			(Self::I8(dst), Self::I8(src)) => assign(dst, start, src),
			(Self::I16(dst), Self::I16(src)) => assign(dst, start, src),
			(Self::I32(dst), Self::I32(src)) => assign(dst, start, src),
			(Self::I64(dst), Self::I64(src)) => assign(dst, start, src),
			(Self::U8(dst), Self::U8(src)) => assign(dst, start, src),
			(Self::U16(dst), Self::U16(src)) => assign(dst, start, src),
			(Self::U32(dst), Self::U32(src)) => assign(dst, start, src),
			(Self::U64(dst), Self::U64(src)) => assign(dst, start, src),
			(Self::F32(dst), Self::F32(src)) => assign(dst, start, src),
			(Self::F64(dst), Self::F64(src)) => assign(dst, start, src),
			_ => false,
		}
	}
}
