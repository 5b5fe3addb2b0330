//! Progress reporting hooks.
//!
//! The merge calls a [`MergeObserver`] at fixed checkpoints. Merging never depends on what the
//! observer does; [`Silent`] ignores everything and [`TracingObserver`] emits `tracing` events.

use crate::array::Dtype;
use tracing::{debug, info, trace};

/// Rows copied from one input into the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowsWritten<'a> {
	/// Input the rows come from.
	pub file: &'a str,
	/// Dataset key.
	pub key: &'a str,
	/// Element type.
	pub dtype: Dtype,
	/// First output row.
	pub start: usize,
	/// One past the last output row.
	pub stop: usize,
	/// Offset added to the values if this is the index dataset.
	pub offset: Option<u64>,
}

/// Receives merge progress.
#[allow(unused_variables)]
pub trait MergeObserver {
	/// Input opened for reconciliation.
	fn checking(&self, file: &str) {}
	/// Input opened for copying.
	fn copying(&self, file: &str) {}
	/// Output attribute written.
	fn attribute_stored(&self, key: &str, values: usize) {}
	/// Output dataset allocated.
	fn dataset_created(&self, key: &str, shape: &[usize], dtype: Dtype) {}
	/// Rows copied.
	fn rows_written(&self, rows: &RowsWritten<'_>) {}
	/// Output completed.
	fn finished(&self, output: &str) {}
}

/// Ignores all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl MergeObserver for Silent {}

/// Emits progress as `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl MergeObserver for TracingObserver {
	fn checking(&self, file: &str) {
		info!(file, "Opened and checking input file");
	}
	fn copying(&self, file: &str) {
		info!(file, "Copying input file");
	}
	fn attribute_stored(&self, key: &str, values: usize) {
		debug!(key, values, "Stored attribute");
	}
	fn dataset_created(&self, key: &str, shape: &[usize], dtype: Dtype) {
		debug!(key, ?shape, %dtype, "Created dataset");
	}
	fn rows_written(&self, rows: &RowsWritten<'_>) {
		match rows.offset {
			Some(offset) => debug!(
				file = rows.file,
				key = rows.key,
				dtype = %rows.dtype,
				start = rows.start,
				stop = rows.stop,
				offset,
				"Wrote index entries with offset added"
			),
			None => trace!(
				file = rows.file,
				key = rows.key,
				dtype = %rows.dtype,
				start = rows.start,
				stop = rows.stop,
				"Wrote entries"
			),
		}
	}
	fn finished(&self, output: &str) {
		info!(output, "Written output file");
	}
}

#[cfg(test)]
pub(crate) mod recording {
	use super::*;
	use std::cell::RefCell;

	/// Collects checkpoints as strings.
	#[derive(Default)]
	pub(crate) struct Recorder {
		pub(crate) events: RefCell<Vec<String>>,
	}

	impl MergeObserver for Recorder {
		fn checking(&self, file: &str) {
			self.events.borrow_mut().push(format!("check {file}"));
		}
		fn copying(&self, file: &str) {
			self.events.borrow_mut().push(format!("copy {file}"));
		}
		fn attribute_stored(&self, key: &str, values: usize) {
			self.events
				.borrow_mut()
				.push(format!("attr {key} {values}"));
		}
		fn dataset_created(&self, key: &str, shape: &[usize], dtype: Dtype) {
			self.events
				.borrow_mut()
				.push(format!("create {key} {shape:?} {dtype}"));
		}
		fn rows_written(&self, rows: &RowsWritten<'_>) {
			self.events.borrow_mut().push(format!(
				"rows {} {} {}..{} {:?}",
				rows.file, rows.key, rows.start, rows.stop, rows.offset
			));
		}
	}
}
