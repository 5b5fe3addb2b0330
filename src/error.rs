//! Error types for stores and merges.

use crate::array::Dtype;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the underlying array store.
#[derive(Error, Debug)]
pub enum StoreError {
	/// File system error.
	#[error("Cannot access {path:?}")]
	Io {
		/// File being accessed.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// ZIP container error.
	#[error("Cannot process ZIP archive {path:?}")]
	Zip {
		/// Archive being processed.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: zip::result::ZipError,
	},
	/// Malformed NPY header.
	#[error("Invalid NPY header of {key:?} in {file:?}")]
	Header {
		/// Store holding the dataset.
		file: String,
		/// Dataset key.
		key: String,
		/// Underlying error.
		#[source]
		source: std::io::Error,
	},
	/// NPY element type outside of the supported set.
	#[error("Unsupported data-type {descr:?} of {key:?} in {file:?}")]
	UnsupportedDtype {
		/// Store holding the dataset.
		file: String,
		/// Dataset key.
		key: String,
		/// NPY type descriptor.
		descr: String,
	},
	/// NPY array data could not be decoded.
	#[error("Cannot read array {key:?} in {file:?}")]
	ReadNpy {
		/// Store holding the dataset.
		file: String,
		/// Dataset key.
		key: String,
		/// Underlying error.
		#[source]
		source: ndarray_npy::ReadNpyError,
	},
	/// NPY array data could not be encoded.
	#[error("Cannot write array {key:?} to {file:?}")]
	WriteNpy {
		/// Store being written.
		file: String,
		/// Dataset key.
		key: String,
		/// Underlying error.
		#[source]
		source: ndarray_npy::WriteNpyError,
	},
	/// Attribute member could not be (de)serialized.
	#[error("Invalid attributes in {file:?}")]
	Json {
		/// Store holding the attributes.
		file: String,
		/// Underlying error.
		#[source]
		source: serde_json::Error,
	},
	/// Dataset key not present in the store.
	#[error("No dataset {key:?} in {file:?}")]
	MissingDataset {
		/// Store being queried.
		file: String,
		/// Dataset key.
		key: String,
	},
	/// Dataset created twice.
	#[error("Dataset {key:?} already exists in {file:?}")]
	DuplicateDataset {
		/// Store being written.
		file: String,
		/// Dataset key.
		key: String,
	},
	/// Rows that do not fit into the created dataset.
	#[error(
		"Cannot write {dtype} rows of shape {found:?} at row {start} into {key:?} of {file:?} with {expected} elements of shape {shape:?}"
	)]
	RowRange {
		/// Store being written.
		file: String,
		/// Dataset key.
		key: String,
		/// First row written.
		start: usize,
		/// Shape of the written rows.
		found: Vec<usize>,
		/// Data-type of the written rows.
		dtype: Dtype,
		/// Shape of the created dataset.
		shape: Vec<usize>,
		/// Data-type of the created dataset.
		expected: Dtype,
	},
}

/// Failure of a merge.
#[derive(Error, Debug)]
pub enum MergeError {
	/// No input stores were given.
	#[error("No input files given")]
	EmptyInput,
	/// Dataset or attribute keys disagree with the first input.
	#[error("{kind} {found:?} of {file:?} do not match first file's {kind} {expected:?}")]
	SchemaMismatch {
		/// Offending input.
		file: String,
		/// Which key set differs.
		kind: KeySet,
		/// Keys of the first input.
		expected: Vec<String>,
		/// Keys of the offending input.
		found: Vec<String>,
	},
	/// Trailing dimensions disagree with the first input.
	#[error(
		"Array {key:?} in {file:?} has shape {found:?} whose trailing dimensions differ from shape {expected:?} in the first file"
	)]
	ShapeMismatch {
		/// Offending input.
		file: String,
		/// Dataset key.
		key: String,
		/// Shape in the first input.
		expected: Vec<usize>,
		/// Shape in the offending input.
		found: Vec<usize>,
	},
	/// Dataset without a row axis.
	#[error("Array {key:?} in {file:?} is zero-dimensional and cannot be concatenated")]
	ScalarDataset {
		/// Offending input.
		file: String,
		/// Dataset key.
		key: String,
	},
	/// Element type disagrees with the first input.
	#[error("Array {key:?} in {file:?} has data-type {found} instead of {expected}")]
	DtypeMismatch {
		/// Offending input.
		file: String,
		/// Dataset key.
		key: String,
		/// Data-type in the first input.
		expected: Dtype,
		/// Data-type in the offending input.
		found: Dtype,
	},
	/// Index dataset cannot hold offsets.
	#[error("Index array {key:?} has non-integer data-type {dtype}")]
	NonIntegerIndex {
		/// Index dataset key.
		key: String,
		/// Its data-type.
		dtype: Dtype,
	},
	/// Index dataset present without its companion.
	#[error("Index array {index:?} needs companion array {companion:?} which is missing")]
	MissingCompanion {
		/// Index dataset key.
		index: String,
		/// Missing companion dataset key.
		companion: String,
	},
	/// Rebasing an index value leaves its data-type.
	#[error("Adding offset {offset} to index array {key:?} of {file:?} overflows {dtype}")]
	OffsetOverflow {
		/// Input being copied.
		file: String,
		/// Index dataset key.
		key: String,
		/// Accumulated companion rows.
		offset: u64,
		/// Data-type of the index dataset.
		dtype: Dtype,
	},
	/// Inputs delivered a different number of rows than planned.
	#[error("Array {key:?} received {written} rows instead of the planned {expected}")]
	Incomplete {
		/// Dataset key.
		key: String,
		/// Rows actually written.
		written: usize,
		/// Rows in the plan.
		expected: usize,
	},
	/// Storage failure, passed through untouched.
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// Key set compared across inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySet {
	/// Dataset keys.
	Datasets,
	/// Attribute keys.
	Attributes,
}

impl std::fmt::Display for KeySet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::Datasets => "keys",
			Self::Attributes => "attributes",
		})
	}
}

/// Result of a merge.
pub type Result<T, E = MergeError> = std::result::Result<T, E>;
