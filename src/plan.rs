//! Reconciling input schemas into a merge plan.

use crate::array::Dtype;
use crate::attr::Scalar;
use crate::error::{KeySet, MergeError, Result};
use crate::observe::MergeObserver;
use crate::store::ArraySource;
use indexmap::{IndexMap, IndexSet};

/// Validated output schema, computed once before any data is copied.
#[derive(Clone, Debug, PartialEq)]
pub struct MergePlan {
	/// Input names in merge order.
	pub files: Vec<String>,
	/// Dataset keys in the order of the first input.
	pub keys: IndexSet<String>,
	/// Attribute keys in the order of the first input.
	pub attr_keys: IndexSet<String>,
	/// Output shape per dataset, rows summed over all inputs.
	pub shapes: IndexMap<String, Vec<usize>>,
	/// Output element type per dataset.
	pub dtypes: IndexMap<String, Dtype>,
	/// Attribute values concatenated in input order.
	pub attrs: IndexMap<String, Vec<Scalar>>,
	/// Rows contributed by each input, per dataset.
	pub rows: IndexMap<String, Vec<usize>>,
}

impl MergePlan {
	/// Total output rows of dataset `key`.
	pub fn total_rows(&self, key: &str) -> Option<usize> {
		self.shapes.get(key).and_then(|shape| shape.first().copied())
	}
}

fn sorted(keys: &IndexSet<String>) -> Vec<String> {
	let mut keys = keys.iter().cloned().collect::<Vec<_>>();
	keys.sort();
	keys
}

/// Checks that all inputs share one schema and plans the concatenated output.
///
/// Inputs must expose equal dataset key sets and equal attribute key sets in any order, and each
/// dataset must agree with the first input on its data-type and on all dimensions but the first.
/// Attribute values are normalized to lists and concatenated in input order.
pub fn reconcile<S: ArraySource>(
	inputs: &mut [S],
	observer: &dyn MergeObserver,
) -> Result<MergePlan> {
	let (first, rest) = inputs.split_first_mut().ok_or(MergeError::EmptyInput)?;
	observer.checking(first.name());
	let keys = first.keys().into_iter().collect::<IndexSet<_>>();
	let first_attrs = first.attrs()?;
	let attr_keys = first_attrs.keys().cloned().collect::<IndexSet<_>>();
	let mut plan = MergePlan {
		files: vec![first.name().to_string()],
		keys,
		attr_keys,
		shapes: IndexMap::new(),
		dtypes: IndexMap::new(),
		attrs: first_attrs
			.into_iter()
			.map(|(key, value)| (key, value.into_list()))
			.collect(),
		rows: IndexMap::new(),
	};
	for key in &plan.keys {
		let meta = first.meta(key)?;
		let rows = *meta
			.shape
			.first()
			.ok_or_else(|| MergeError::ScalarDataset {
				file: first.name().to_string(),
				key: key.clone(),
			})?;
		plan.shapes.insert(key.clone(), meta.shape);
		plan.dtypes.insert(key.clone(), meta.dtype);
		plan.rows.insert(key.clone(), vec![rows]);
	}
	for input in rest {
		let file = input.name().to_string();
		observer.checking(&file);
		let keys = input.keys().into_iter().collect::<IndexSet<_>>();
		if keys != plan.keys {
			return Err(MergeError::SchemaMismatch {
				file,
				kind: KeySet::Datasets,
				expected: sorted(&plan.keys),
				found: sorted(&keys),
			});
		}
		let attrs = input.attrs()?;
		let attr_keys = attrs.keys().cloned().collect::<IndexSet<_>>();
		if attr_keys != plan.attr_keys {
			return Err(MergeError::SchemaMismatch {
				file,
				kind: KeySet::Attributes,
				expected: sorted(&plan.attr_keys),
				found: sorted(&attr_keys),
			});
		}
		for (key, value) in attrs {
			if let Some(values) = plan.attrs.get_mut(&key) {
				values.extend(value.into_list());
			}
		}
		for key in &plan.keys {
			let meta = input.meta(key)?;
			let Some((&rows, trailing)) = meta.shape.split_first() else {
				return Err(MergeError::ScalarDataset {
					file,
					key: key.clone(),
				});
			};
			// Keys are equal to the first input's, so every entry exists.
			let (Some(shape), Some(&dtype), Some(counts)) = (
				plan.shapes.get_mut(key),
				plan.dtypes.get(key),
				plan.rows.get_mut(key),
			) else {
				continue;
			};
			if shape[1..] != *trailing {
				let mut expected = shape.clone();
				expected[0] = counts[0];
				return Err(MergeError::ShapeMismatch {
					file,
					key: key.clone(),
					expected,
					found: meta.shape,
				});
			}
			if dtype != meta.dtype {
				return Err(MergeError::DtypeMismatch {
					file,
					key: key.clone(),
					expected: dtype,
					found: meta.dtype,
				});
			}
			shape[0] += rows;
			counts.push(rows);
		}
		plan.files.push(file);
	}
	Ok(plan)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::array::ArrayData;
	use crate::attr::AttrValue;
	use crate::observe::{Silent, recording::Recorder};
	use crate::store::MemFile;
	use ndarray::{Array2, array};

	fn file(name: &str, hits: usize, events: usize) -> MemFile {
		MemFile::new(name)
			.with_dataset("hit_pmt", Array2::<i32>::zeros((hits, 2)).into_dyn())
			.with_dataset(
				"event_hits_index",
				ndarray::Array1::<i64>::zeros(events).into_dyn(),
			)
			.with_attr("command", AttrValue::from(Scalar::from(name)))
			.with_attr("seeds", vec![Scalar::Int(1), Scalar::Int(2)])
	}

	#[test]
	fn empty_input_is_rejected() {
		let mut inputs: Vec<MemFile> = Vec::new();
		assert!(matches!(
			reconcile(&mut inputs, &Silent),
			Err(MergeError::EmptyInput)
		));
	}

	#[test]
	fn shapes_are_summed_and_attributes_concatenated() {
		let mut inputs = vec![file("a", 3, 2), file("b", 2, 2), file("c", 0, 1)];
		let plan = reconcile(&mut inputs, &Silent).unwrap();
		assert_eq!(plan.files, ["a", "b", "c"]);
		assert_eq!(plan.shapes["hit_pmt"], vec![5, 2]);
		assert_eq!(plan.shapes["event_hits_index"], vec![5]);
		assert_eq!(plan.rows["hit_pmt"], vec![3, 2, 0]);
		assert_eq!(plan.dtypes["hit_pmt"], Dtype::I32);
		assert_eq!(
			plan.attrs["command"],
			vec![Scalar::from("a"), Scalar::from("b"), Scalar::from("c")]
		);
		assert_eq!(plan.attrs["seeds"].len(), 6);
		assert_eq!(plan.total_rows("hit_pmt"), Some(5));
	}

	#[test]
	fn key_order_does_not_matter() {
		let a = file("a", 1, 1);
		let b = MemFile::new("b")
			.with_attr("seeds", vec![Scalar::Int(3)])
			.with_attr("command", AttrValue::from(Scalar::from("b")))
			.with_dataset("event_hits_index", array![0i64].into_dyn())
			.with_dataset("hit_pmt", Array2::<i32>::zeros((1, 2)).into_dyn());
		let plan = reconcile(&mut [a, b], &Silent).unwrap();
		assert_eq!(
			plan.keys.iter().collect::<Vec<_>>(),
			["hit_pmt", "event_hits_index"]
		);
		assert_eq!(
			plan.attrs["seeds"],
			vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]
		);
		assert_eq!(
			plan.attrs["command"],
			vec![Scalar::from("a"), Scalar::from("b")]
		);
	}

	#[test]
	fn differing_dataset_keys_name_the_file() {
		let b = file("b", 1, 1).with_dataset("extra", array![1u8].into_dyn());
		let err = reconcile(&mut [file("a", 1, 1), b], &Silent).unwrap_err();
		match err {
			MergeError::SchemaMismatch {
				file,
				kind,
				expected,
				found,
			} => {
				assert_eq!(file, "b");
				assert_eq!(kind, KeySet::Datasets);
				assert_eq!(expected, ["event_hits_index", "hit_pmt"]);
				assert_eq!(found, ["event_hits_index", "extra", "hit_pmt"]);
			}
			err => panic!("unexpected {err:?}"),
		}
	}

	#[test]
	fn differing_attribute_keys_are_rejected() {
		let b = file("b", 1, 1).with_attr("tag", AttrValue::from(Scalar::Bool(true)));
		let err = reconcile(&mut [file("a", 1, 1), b], &Silent).unwrap_err();
		assert!(matches!(
			err,
			MergeError::SchemaMismatch {
				kind: KeySet::Attributes,
				..
			}
		));
	}

	#[test]
	fn trailing_shape_mismatch_cites_key() {
		let x = |name: &str, shape: (usize, usize)| {
			MemFile::new(name).with_dataset("X", Array2::<f64>::zeros(shape).into_dyn())
		};
		let mut inputs = [x("a", (5, 4)), x("b", (2, 4)), x("c", (3, 5))];
		let err = reconcile(&mut inputs, &Silent).unwrap_err();
		assert!(err.to_string().contains("[5, 4] in the first file"), "{err}");
		match err {
			MergeError::ShapeMismatch {
				file,
				key,
				expected,
				found,
			} => {
				assert_eq!(file, "c");
				assert_eq!(key, "X");
				assert_eq!(expected, vec![5, 4]);
				assert_eq!(found, vec![3, 5]);
			}
			err => panic!("unexpected {err:?}"),
		}
	}

	#[test]
	fn dtype_mismatch_is_rejected() {
		let a = MemFile::new("a").with_dataset("X", array![1i32].into_dyn());
		let b = MemFile::new("b").with_dataset("X", array![1i64].into_dyn());
		let err = reconcile(&mut [a, b], &Silent).unwrap_err();
		assert!(matches!(
			err,
			MergeError::DtypeMismatch {
				expected: Dtype::I32,
				found: Dtype::I64,
				..
			}
		));
	}

	#[test]
	fn zero_dimensional_datasets_cannot_be_planned() {
		let a = MemFile::new("a").with_dataset("X", ArrayData::zeros(Dtype::F32, &[]));
		let err = reconcile(&mut [a], &Silent).unwrap_err();
		assert!(matches!(err, MergeError::ScalarDataset { .. }));
	}

	#[test]
	fn every_input_is_reported_once() {
		let recorder = Recorder::default();
		reconcile(&mut [file("a", 1, 1), file("b", 1, 1)], &recorder).unwrap();
		assert_eq!(*recorder.events.borrow(), ["check a", "check b"]);
	}
}
