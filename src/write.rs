//! Copying inputs into the planned output.

use crate::config::IndexPair;
use crate::error::{MergeError, Result};
use crate::observe::{MergeObserver, RowsWritten};
use crate::plan::MergePlan;
use crate::store::{ArraySink, ArraySource};
use indexmap::IndexMap;
use tracing::warn;

/// Index pairing that applies to `plan`, `None` if the plan has no index dataset.
fn applicable<'a>(
	plan: &MergePlan,
	reindex: Option<&'a IndexPair>,
) -> Result<Option<&'a IndexPair>> {
	let Some(pair) = reindex else {
		return Ok(None);
	};
	let Some(&dtype) = plan.dtypes.get(&pair.index) else {
		warn!(index = %pair.index, "No index array, copying all arrays verbatim");
		return Ok(None);
	};
	if !dtype.is_integer() {
		return Err(MergeError::NonIntegerIndex {
			key: pair.index.clone(),
			dtype,
		});
	}
	if !plan.keys.contains(&pair.companion) {
		return Err(MergeError::MissingCompanion {
			index: pair.index.clone(),
			companion: pair.companion.clone(),
		});
	}
	Ok(Some(pair))
}

/// Writes the concatenation of `inputs` into `output` as planned.
///
/// Sets every planned attribute, creates every planned dataset, and copies each input's rows
/// behind those of the preceding inputs. With `reindex`, values of the index dataset are shifted
/// by the number of companion rows of all preceding inputs. `inputs` must be the stores `plan`
/// was reconciled from, in the same order.
pub fn write<S, W>(
	plan: &MergePlan,
	inputs: &mut [S],
	output: &mut W,
	reindex: Option<&IndexPair>,
	observer: &dyn MergeObserver,
) -> Result<()>
where
	S: ArraySource,
	W: ArraySink + ?Sized,
{
	let reindex = applicable(plan, reindex)?;
	for key in &plan.attr_keys {
		let values = plan.attrs.get(key).cloned().unwrap_or_default();
		let len = values.len();
		output.set_attr(key, values)?;
		observer.attribute_stored(key, len);
	}
	for (key, shape) in &plan.shapes {
		let dtype = plan.dtypes[key];
		output.create_dataset(key, shape, dtype)?;
		observer.dataset_created(key, shape, dtype);
	}
	let mut starts = plan
		.keys
		.iter()
		.map(|key| (key.as_str(), 0))
		.collect::<IndexMap<_, usize>>();
	let mut offset = 0u64;
	for input in inputs.iter_mut() {
		let file = input.name().to_string();
		observer.copying(&file);
		for (key, start) in &mut starts {
			let is_index = reindex.is_some_and(|pair| pair.index == *key);
			let data = input.read(key)?;
			let rows = data.rows().ok_or_else(|| MergeError::ScalarDataset {
				file: file.clone(),
				key: key.to_string(),
			})?;
			let stop = *start + rows;
			let data = if is_index {
				data.offset(offset)
					.ok_or_else(|| MergeError::OffsetOverflow {
						file: file.clone(),
						key: key.to_string(),
						offset,
						dtype: data.dtype(),
					})?
			} else {
				data
			};
			output.write_rows(key, *start, &data)?;
			observer.rows_written(&RowsWritten {
				file: &file,
				key,
				dtype: data.dtype(),
				start: *start,
				stop,
				offset: is_index.then_some(offset),
			});
			*start = stop;
		}
		if let Some(pair) = reindex {
			let rows = input.meta(&pair.companion)?.shape.first().copied().unwrap_or(0);
			offset += rows as u64;
		}
	}
	for (key, written) in starts {
		let expected = plan.total_rows(key).unwrap_or(0);
		if written != expected {
			return Err(MergeError::Incomplete {
				key: key.to_string(),
				written,
				expected,
			});
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::array::{ArrayData, Dtype};
	use crate::attr::{AttrValue, Scalar};
	use crate::error::StoreError;
	use crate::observe::{Silent, recording::Recorder};
	use crate::plan::reconcile;
	use crate::store::MemFile;
	use ndarray::{Array2, array};

	fn input(name: &str, hits: usize, index: &[i64]) -> MemFile {
		let pmt = Array2::from_shape_fn((hits, 2), |(row, col)| (row * 10 + col) as i32);
		MemFile::new(name)
			.with_dataset("hit_pmt", pmt.into_dyn())
			.with_dataset(
				"event_hits_index",
				ndarray::Array1::from(index.to_vec()).into_dyn(),
			)
			.with_attr("command", AttrValue::from(Scalar::from(name)))
	}

	fn merge(inputs: &mut [MemFile], reindex: Option<&IndexPair>) -> Result<MemFile> {
		let plan = reconcile(inputs, &Silent)?;
		let mut output = MemFile::new("out");
		write(&plan, inputs, &mut output, reindex, &Silent)?;
		Ok(output)
	}

	#[test]
	fn second_file_index_is_shifted_by_first_file_hits() {
		let mut inputs = [input("a", 3, &[0, 2]), input("b", 2, &[0, 1])];
		let output = merge(&mut inputs, Some(&IndexPair::default())).unwrap();
		assert_eq!(
			output.dataset("event_hits_index"),
			Some(&ArrayData::from(array![0i64, 2, 3, 4].into_dyn()))
		);
		assert_eq!(
			output.dataset("hit_pmt"),
			Some(&ArrayData::from(
				array![[0i32, 1], [10, 11], [20, 21], [0, 1], [10, 11]].into_dyn()
			))
		);
		assert_eq!(
			output.attr("command"),
			Some(&AttrValue::List(vec![Scalar::from("a"), Scalar::from("b")]))
		);
	}

	#[test]
	fn offset_accumulates_over_many_files() {
		let mut inputs = [
			input("a", 3, &[0]),
			input("b", 0, &[]),
			input("c", 4, &[0, 3]),
			input("d", 1, &[0]),
		];
		let output = merge(&mut inputs, Some(&IndexPair::default())).unwrap();
		assert_eq!(
			output.dataset("event_hits_index"),
			Some(&ArrayData::from(array![0i64, 3, 6, 7].into_dyn()))
		);
	}

	#[test]
	fn single_file_is_reproduced() {
		let original = input("a", 3, &[0, 2]);
		let output = merge(&mut [original.clone()], Some(&IndexPair::default())).unwrap();
		for key in ["hit_pmt", "event_hits_index"] {
			assert_eq!(output.dataset(key), original.dataset(key));
		}
		assert_eq!(
			output.attr("command"),
			Some(&AttrValue::List(vec![Scalar::from("a")]))
		);
	}

	#[test]
	fn without_reindex_everything_is_copied_verbatim() {
		let mut inputs = [input("a", 3, &[0, 2]), input("b", 2, &[0, 1])];
		let output = merge(&mut inputs, None).unwrap();
		assert_eq!(
			output.dataset("event_hits_index"),
			Some(&ArrayData::from(array![0i64, 2, 0, 1].into_dyn()))
		);
	}

	#[test]
	fn custom_pairing_is_honored() {
		let file = |name: &str, tracks: usize, first: u32| {
			MemFile::new(name)
				.with_dataset("tracks", ndarray::Array1::<f32>::zeros(tracks).into_dyn())
				.with_dataset("track_index", array![first].into_dyn())
		};
		let mut inputs = [file("a", 5, 4), file("b", 2, 1)];
		let pair = IndexPair::new("track_index", "tracks");
		let output = merge(&mut inputs, Some(&pair)).unwrap();
		assert_eq!(
			output.dataset("track_index"),
			Some(&ArrayData::from(array![4u32, 6].into_dyn()))
		);
	}

	#[test]
	fn missing_index_copies_verbatim() {
		let file = |name: &str| MemFile::new(name).with_dataset("x", array![1u8, 2].into_dyn());
		let output = merge(&mut [file("a"), file("b")], Some(&IndexPair::default())).unwrap();
		assert_eq!(
			output.dataset("x"),
			Some(&ArrayData::from(array![1u8, 2, 1, 2].into_dyn()))
		);
	}

	#[test]
	fn missing_companion_is_rejected() {
		let file = |name: &str| {
			MemFile::new(name).with_dataset("event_hits_index", array![0i64].into_dyn())
		};
		let err = merge(&mut [file("a"), file("b")], Some(&IndexPair::default())).unwrap_err();
		assert!(matches!(err, MergeError::MissingCompanion { .. }));
	}

	#[test]
	fn float_index_is_rejected() {
		let file = |name: &str| {
			MemFile::new(name)
				.with_dataset("hit_pmt", array![1i32].into_dyn())
				.with_dataset("event_hits_index", array![0.0f64].into_dyn())
		};
		let err = merge(&mut [file("a")], Some(&IndexPair::default())).unwrap_err();
		assert!(matches!(
			err,
			MergeError::NonIntegerIndex {
				dtype: Dtype::F64,
				..
			}
		));
	}

	#[test]
	fn overflowing_offset_is_reported() {
		let file = |name: &str| {
			MemFile::new(name)
				.with_dataset("hit_pmt", ndarray::Array1::<u8>::zeros(200).into_dyn())
				.with_dataset("event_hits_index", array![100u8].into_dyn())
		};
		let err = merge(&mut [file("a"), file("b")], Some(&IndexPair::default())).unwrap_err();
		match err {
			MergeError::OffsetOverflow {
				file,
				key,
				offset,
				dtype,
			} => {
				assert_eq!(file, "b");
				assert_eq!(key, "event_hits_index");
				assert_eq!(offset, 200);
				assert_eq!(dtype, Dtype::U8);
			}
			err => panic!("unexpected {err:?}"),
		}
	}

	#[test]
	fn empty_index_after_large_offset_is_copied() {
		let file = |name: &str, hits: usize, index: Vec<u8>| {
			MemFile::new(name)
				.with_dataset("hit_pmt", ndarray::Array1::<u8>::zeros(hits).into_dyn())
				.with_dataset("event_hits_index", ndarray::Array1::from(index).into_dyn())
		};
		let mut inputs = [file("a", 300, vec![0]), file("b", 0, vec![])];
		let output = merge(&mut inputs, Some(&IndexPair::default())).unwrap();
		assert_eq!(
			output.dataset("event_hits_index"),
			Some(&ArrayData::from(array![0u8].into_dyn()))
		);
	}

	#[test]
	fn rows_grown_after_planning_are_rejected() {
		let mut inputs = [input("a", 1, &[0]), input("b", 1, &[0])];
		let plan = reconcile(&mut inputs, &Silent).unwrap();
		inputs[1] = input("b", 2, &[0]);
		let err = write(
			&plan,
			&mut inputs,
			&mut MemFile::new("out"),
			Some(&IndexPair::default()),
			&Silent,
		)
		.unwrap_err();
		assert!(matches!(
			err,
			MergeError::Store(StoreError::RowRange { .. })
		));
	}

	#[test]
	fn rows_shrunk_after_planning_are_incomplete() {
		let mut inputs = [input("a", 1, &[0]), input("b", 2, &[0])];
		let plan = reconcile(&mut inputs, &Silent).unwrap();
		inputs[1] = input("b", 1, &[0]);
		let err = write(&plan, &mut inputs, &mut MemFile::new("out"), None, &Silent).unwrap_err();
		assert!(matches!(
			err,
			MergeError::Incomplete {
				written: 2,
				expected: 3,
				..
			}
		));
	}

	#[test]
	fn checkpoints_follow_file_then_key_order() {
		let mut inputs = [input("a", 3, &[0, 2]), input("b", 2, &[0, 1])];
		let plan = reconcile(&mut inputs, &Silent).unwrap();
		let recorder = Recorder::default();
		write(
			&plan,
			&mut inputs,
			&mut MemFile::new("out"),
			Some(&IndexPair::default()),
			&recorder,
		)
		.unwrap();
		assert_eq!(
			*recorder.events.borrow(),
			[
				"attr command 2",
				"create hit_pmt [5, 2] i32",
				"create event_hits_index [4] i64",
				"copy a",
				"rows a hit_pmt 0..3 None",
				"rows a event_hits_index 0..2 Some(0)",
				"copy b",
				"rows b hit_pmt 3..5 None",
				"rows b event_hits_index 2..4 Some(3)",
			]
		);
	}
}
