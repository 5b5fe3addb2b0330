//! Concatenates NPZ archives of named arrays along their rows and rebases index arrays
//!
//! Every input archive must hold the same array keys and the same attribute keys. Arrays are
//! stacked along their first axis in the order the inputs are given, requiring equal data-types
//! and equal trailing dimensions. Attributes are concatenated into lists in the same order.
//!
//! One index array may point into the rows of a companion array, like `event_hits_index` into
//! `hit_pmt`. Its values are only meaningful within their own input, so each is shifted by the
//! number of companion rows contributed by all preceding inputs.
//!
//! ```no_run
//! use npzcat::{MergeOptions, TracingObserver, merge_files};
//!
//! let inputs = ["run-1.npz", "run-2.npz"];
//! let plan = merge_files(&inputs, Some("merged.npz"), &MergeOptions::default(), &TracingObserver)?;
//! println!("merged {} arrays", plan.keys.len());
//! # Ok::<(), npzcat::MergeError>(())
//! ```
//!
//! Merging runs in two passes. [`reconcile`] validates the inputs and computes a [`MergePlan`],
//! then [`write`] copies the data. Both work on any store implementing [`ArraySource`] and
//! [`ArraySink`], of which [`NpzReader`], [`NpzWriter`], and [`MemFile`] are provided.

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

pub mod array;
pub mod attr;
pub mod config;
pub mod error;
pub mod npz;
pub mod observe;
pub mod plan;
pub mod store;
pub mod write;

pub use crate::array::{ArrayData, Dtype};
pub use crate::attr::{AttrValue, Scalar};
pub use crate::config::{COMPANION_KEY, Compression, INDEX_KEY, IndexPair, MergeOptions};
pub use crate::error::{KeySet, MergeError, Result, StoreError};
pub use crate::npz::{NpzReader, NpzWriter};
pub use crate::observe::{MergeObserver, RowsWritten, Silent, TracingObserver};
pub use crate::plan::{MergePlan, reconcile};
pub use crate::store::{ArraySink, ArraySource, DatasetMeta, MemFile};
pub use crate::write::write;

use std::path::Path;

/// Reconciles `inputs` and writes their concatenation into `output`.
///
/// The inputs stay open across both passes.
pub fn merge<S, W>(
	inputs: &mut [S],
	output: &mut W,
	options: &MergeOptions,
	observer: &dyn MergeObserver,
) -> Result<MergePlan>
where
	S: ArraySource,
	W: ArraySink + ?Sized,
{
	let plan = reconcile(inputs, observer)?;
	write(&plan, inputs, output, options.reindex.as_ref(), observer)?;
	Ok(plan)
}

/// Merges the NPZ archives at `inputs` into a new NPZ archive at `output`.
///
/// Without `output`, the inputs are only reconciled. The output is created after the inputs
/// have been reconciled successfully; if copying fails, it is left incomplete.
pub fn merge_files<I, O>(
	inputs: &[I],
	output: Option<O>,
	options: &MergeOptions,
	observer: &dyn MergeObserver,
) -> Result<MergePlan>
where
	I: AsRef<Path>,
	O: AsRef<Path>,
{
	if inputs.is_empty() {
		return Err(MergeError::EmptyInput);
	}
	let mut readers = inputs
		.iter()
		.map(NpzReader::open)
		.collect::<Result<Vec<_>, _>>()?;
	let plan = reconcile(&mut readers, observer)?;
	if let Some(output) = output {
		let mut writer = NpzWriter::create(output, options)?;
		write(
			&plan,
			&mut readers,
			&mut writer,
			options.reindex.as_ref(),
			observer,
		)?;
		let name = writer.name().to_string();
		writer.finish()?;
		observer.finished(&name);
	}
	Ok(plan)
}
