//! Abstract array stores.
//!
//! A store is a flat mapping from keys to N-dimensional arrays plus a flat mapping from keys to
//! attributes. The merge reads inputs through [`ArraySource`] and writes the output through
//! [`ArraySink`]. Handles release their resources when dropped.

use crate::array::{ArrayData, Dtype};
use crate::attr::{AttrValue, Scalar};
use crate::error::StoreError;
use indexmap::IndexMap;

/// Shape and data-type of a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetMeta {
	/// Dimensions, the first one being rows.
	pub shape: Vec<usize>,
	/// Element type.
	pub dtype: Dtype,
}

/// Readable store.
pub trait ArraySource {
	/// Name used in messages, usually the file path.
	fn name(&self) -> &str;
	/// Dataset keys in store order.
	fn keys(&self) -> Vec<String>;
	/// Attributes in store order.
	fn attrs(&mut self) -> Result<IndexMap<String, AttrValue>, StoreError>;
	/// Shape and data-type of dataset `key`.
	fn meta(&mut self, key: &str) -> Result<DatasetMeta, StoreError>;
	/// Whole dataset `key`.
	fn read(&mut self, key: &str) -> Result<ArrayData, StoreError>;
}

/// Writable store.
pub trait ArraySink {
	/// Name used in messages, usually the file path.
	fn name(&self) -> &str;
	/// Sets attribute `key` to a list of values.
	fn set_attr(&mut self, key: &str, values: Vec<Scalar>) -> Result<(), StoreError>;
	/// Creates dataset `key`, its content undefined until written.
	fn create_dataset(
		&mut self,
		key: &str,
		shape: &[usize],
		dtype: Dtype,
	) -> Result<(), StoreError>;
	/// Writes `rows` into dataset `key` starting at row `start`.
	fn write_rows(&mut self, key: &str, start: usize, rows: &ArrayData) -> Result<(), StoreError>;
}

/// Buffered datasets of a store under construction, shared by sinks that write whole arrays at
/// the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Datasets {
	pub(crate) arrays: IndexMap<String, ArrayData>,
}

impl Datasets {
	pub(crate) fn create(
		&mut self,
		file: &str,
		key: &str,
		shape: &[usize],
		dtype: Dtype,
	) -> Result<(), StoreError> {
		if self.arrays.contains_key(key) {
			return Err(StoreError::DuplicateDataset {
				file: file.to_string(),
				key: key.to_string(),
			});
		}
		self.arrays
			.insert(key.to_string(), ArrayData::zeros(dtype, shape));
		Ok(())
	}
	pub(crate) fn write_rows(
		&mut self,
		file: &str,
		key: &str,
		start: usize,
		rows: &ArrayData,
	) -> Result<(), StoreError> {
		let array = self
			.arrays
			.get_mut(key)
			.ok_or_else(|| StoreError::MissingDataset {
				file: file.to_string(),
				key: key.to_string(),
			})?;
		if array.assign_rows(start, rows) {
			Ok(())
		} else {
			Err(StoreError::RowRange {
				file: file.to_string(),
				key: key.to_string(),
				start,
				found: rows.shape().to_vec(),
				dtype: rows.dtype(),
				shape: array.shape().to_vec(),
				expected: array.dtype(),
			})
		}
	}
}

/// Store held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemFile {
	name: String,
	datasets: Datasets,
	attrs: IndexMap<String, AttrValue>,
}

impl MemFile {
	/// Empty store called `name`.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}
	/// Adds or replaces dataset `key`.
	pub fn with_dataset(mut self, key: impl Into<String>, data: impl Into<ArrayData>) -> Self {
		self.datasets.arrays.insert(key.into(), data.into());
		self
	}
	/// Adds or replaces attribute `key`.
	pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.attrs.insert(key.into(), value.into());
		self
	}
	/// Dataset `key`, if any.
	pub fn dataset(&self, key: &str) -> Option<&ArrayData> {
		self.datasets.arrays.get(key)
	}
	/// Attribute `key`, if any.
	pub fn attr(&self, key: &str) -> Option<&AttrValue> {
		self.attrs.get(key)
	}
}

impl ArraySource for MemFile {
	fn name(&self) -> &str {
		&self.name
	}
	fn keys(&self) -> Vec<String> {
		self.datasets.arrays.keys().cloned().collect()
	}
	fn attrs(&mut self) -> Result<IndexMap<String, AttrValue>, StoreError> {
		Ok(self.attrs.clone())
	}
	fn meta(&mut self, key: &str) -> Result<DatasetMeta, StoreError> {
		let data = self.read(key)?;
		Ok(DatasetMeta {
			shape: data.shape().to_vec(),
			dtype: data.dtype(),
		})
	}
	fn read(&mut self, key: &str) -> Result<ArrayData, StoreError> {
		self.datasets
			.arrays
			.get(key)
			.cloned()
			.ok_or_else(|| StoreError::MissingDataset {
				file: self.name.clone(),
				key: key.to_string(),
			})
	}
}

impl ArraySink for MemFile {
	fn name(&self) -> &str {
		&self.name
	}
	fn set_attr(&mut self, key: &str, values: Vec<Scalar>) -> Result<(), StoreError> {
		self.attrs
			.insert(key.to_string(), AttrValue::List(values));
		Ok(())
	}
	fn create_dataset(
		&mut self,
		key: &str,
		shape: &[usize],
		dtype: Dtype,
	) -> Result<(), StoreError> {
		self.datasets.create(&self.name, key, shape, dtype)
	}
	fn write_rows(&mut self, key: &str, start: usize, rows: &ArrayData) -> Result<(), StoreError> {
		self.datasets.write_rows(&self.name, key, start, rows)
	}
}
