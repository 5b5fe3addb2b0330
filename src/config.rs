//! Merge configuration.

/// Default key of the index dataset.
pub const INDEX_KEY: &str = "event_hits_index";
/// Default key of the dataset the index points into.
pub const COMPANION_KEY: &str = "hit_pmt";

/// Index dataset and the companion dataset its values point into.
///
/// While merging, each value of the index dataset is shifted by the number of companion rows
/// contributed by all preceding inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexPair {
	/// Key of the index dataset.
	pub index: String,
	/// Key of the companion dataset.
	pub companion: String,
}

impl IndexPair {
	/// Pairs `index` with `companion`.
	pub fn new(index: impl Into<String>, companion: impl Into<String>) -> Self {
		Self {
			index: index.into(),
			companion: companion.into(),
		}
	}
}

impl Default for IndexPair {
	fn default() -> Self {
		Self::new(INDEX_KEY, COMPANION_KEY)
	}
}

/// Compression of output archive members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
	/// Uncompressed.
	#[default]
	Stored,
	/// Deflated.
	Deflated,
}

impl std::str::FromStr for Compression {
	type Err = String;

	fn from_str(method: &str) -> Result<Self, Self::Err> {
		match method {
			"stored" => Ok(Self::Stored),
			"deflated" => Ok(Self::Deflated),
			_ => Err(format!("Unsupported method {method:?}")),
		}
	}
}

/// Options of a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
	/// Index rewriting, `None` to copy every dataset verbatim.
	pub reindex: Option<IndexPair>,
	/// Compression of the output archive.
	pub compression: Compression,
	/// Whether an existing output file is overwritten.
	pub force: bool,
}

impl Default for MergeOptions {
	fn default() -> Self {
		Self {
			reindex: Some(IndexPair::default()),
			compression: Compression::default(),
			force: false,
		}
	}
}
