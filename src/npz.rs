//! NPZ archives as array stores.
//!
//! An NPZ archive is a ZIP archive with one NPY file per array, named after the array key with an
//! `.npy` extension. Attributes are kept in the [`ATTRS_MEMBER`] JSON object whose key order is
//! the attribute insertion order.

use crate::array::{ArrayData, Dtype};
use crate::attr::{AttrValue, Scalar};
use crate::config::{Compression, MergeOptions};
use crate::error::StoreError;
use crate::store::{ArraySink, ArraySource, DatasetMeta, Datasets};
use indexmap::IndexMap;
use npyz::{DType, NpyFile};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive member holding the attributes.
pub const ATTRS_MEMBER: &str = "__attrs__.json";

const NPY_EXTENSION: &str = ".npy";

fn member(key: &str) -> String {
	format!("{key}{NPY_EXTENSION}")
}

/// Input NPZ archive.
pub struct NpzReader<R: Read + Seek = BufReader<File>> {
	path: PathBuf,
	name: String,
	archive: ZipArchive<R>,
	keys: Vec<String>,
	meta: IndexMap<String, DatasetMeta>,
}

impl NpzReader<BufReader<File>> {
	/// Opens the NPZ archive at `path`.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|source| StoreError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::new(path, BufReader::new(file))
	}
}

impl<R: Read + Seek> NpzReader<R> {
	/// Reads the NPZ archive in `reader`, calling it `path` in messages.
	pub fn new<P: AsRef<Path>>(path: P, reader: R) -> Result<Self, StoreError> {
		let path = path.as_ref().to_path_buf();
		let archive = ZipArchive::new(reader).map_err(|source| StoreError::Zip {
			path: path.clone(),
			source,
		})?;
		let keys = archive
			.file_names()
			.filter_map(|name| name.strip_suffix(NPY_EXTENSION))
			.map(str::to_string)
			.collect::<Vec<_>>();
		let name = path.display().to_string();
		debug!(file = %name, arrays = keys.len(), "Opened NPZ archive");
		Ok(Self {
			path,
			name,
			archive,
			keys,
			meta: IndexMap::new(),
		})
	}
	fn not_found(&self, key: &str) -> impl FnOnce(ZipError) -> StoreError + use<R> {
		let (path, file, key) = (self.path.clone(), self.name.clone(), key.to_string());
		move |source| match source {
			ZipError::FileNotFound => StoreError::MissingDataset { file, key },
			source => StoreError::Zip { path, source },
		}
	}
}

impl<R: Read + Seek> ArraySource for NpzReader<R> {
	fn name(&self) -> &str {
		&self.name
	}
	fn keys(&self) -> Vec<String> {
		self.keys.clone()
	}
	fn attrs(&mut self) -> Result<IndexMap<String, AttrValue>, StoreError> {
		let mut json = String::new();
		match self.archive.by_name(ATTRS_MEMBER) {
			Ok(mut file) => file.read_to_string(&mut json).map_err(|source| StoreError::Io {
				path: self.path.clone(),
				source,
			})?,
			Err(ZipError::FileNotFound) => return Ok(IndexMap::new()),
			Err(source) => {
				return Err(StoreError::Zip {
					path: self.path.clone(),
					source,
				});
			}
		};
		serde_json::from_str(&json).map_err(|source| StoreError::Json {
			file: self.name.clone(),
			source,
		})
	}
	fn meta(&mut self, key: &str) -> Result<DatasetMeta, StoreError> {
		if let Some(meta) = self.meta.get(key) {
			return Ok(meta.clone());
		}
		let not_found = self.not_found(key);
		let file = self.archive.by_name(&member(key)).map_err(not_found)?;
		let npy = NpyFile::new(file).map_err(|source| StoreError::Header {
			file: self.name.clone(),
			key: key.to_string(),
			source,
		})?;
		let descr = match npy.dtype() {
			DType::Plain(ty) => ty.to_string(),
			dtype => format!("{dtype:?}"),
		};
		let dtype = Dtype::from_descr(&descr).ok_or_else(|| StoreError::UnsupportedDtype {
			file: self.name.clone(),
			key: key.to_string(),
			descr,
		})?;
		let meta = DatasetMeta {
			shape: npy.shape().iter().map(|&dim| dim as usize).collect(),
			dtype,
		};
		self.meta.insert(key.to_string(), meta.clone());
		Ok(meta)
	}
	fn read(&mut self, key: &str) -> Result<ArrayData, StoreError> {
		let dtype = self.meta(key)?.dtype;
		let not_found = self.not_found(key);
		let file = self.archive.by_name(&member(key)).map_err(not_found)?;
		ArrayData::read_npy(dtype, file).map_err(|source| StoreError::ReadNpy {
			file: self.name.clone(),
			key: key.to_string(),
			source,
		})
	}
}

/// Output NPZ archive.
///
/// Datasets are buffered in memory and written to the archive by [`Self::finish`].
pub struct NpzWriter<W: Write + Seek = BufWriter<File>> {
	path: PathBuf,
	name: String,
	zip: ZipWriter<W>,
	options: SimpleFileOptions,
	attrs: IndexMap<String, Vec<Scalar>>,
	datasets: Datasets,
}

impl NpzWriter<BufWriter<File>> {
	/// Creates the NPZ archive at `path`, refusing to replace an existing file unless forced.
	pub fn create<P: AsRef<Path>>(path: P, options: &MergeOptions) -> Result<Self, StoreError> {
		let path = path.as_ref();
		let file = OpenOptions::new()
			.create_new(!options.force)
			.create(true)
			.truncate(true)
			.read(true)
			.write(true)
			.open(path)
			.map_err(|source| StoreError::Io {
				path: path.to_path_buf(),
				source,
			})?;
		Ok(Self::new(path, BufWriter::new(file), options.compression))
	}
}

impl<W: Write + Seek> NpzWriter<W> {
	/// Writes an NPZ archive into `writer`, calling it `path` in messages.
	pub fn new<P: AsRef<Path>>(path: P, writer: W, compression: Compression) -> Self {
		let method = match compression {
			Compression::Stored => CompressionMethod::Stored,
			Compression::Deflated => CompressionMethod::Deflated,
		};
		let path = path.as_ref().to_path_buf();
		Self {
			name: path.display().to_string(),
			path,
			zip: ZipWriter::new(writer),
			options: SimpleFileOptions::default()
				.compression_method(method)
				.large_file(true),
			attrs: IndexMap::new(),
			datasets: Datasets::default(),
		}
	}
	fn zip_err(&self) -> impl FnOnce(ZipError) -> StoreError + use<W> {
		let path = self.path.clone();
		move |source| StoreError::Zip { path, source }
	}
	/// Writes attributes and datasets and completes the archive.
	pub fn finish(mut self) -> Result<W, StoreError> {
		if !self.attrs.is_empty() {
			let zip_err = self.zip_err();
			self.zip
				.start_file(ATTRS_MEMBER, self.options)
				.map_err(zip_err)?;
			serde_json::to_writer_pretty(&mut self.zip, &self.attrs).map_err(|source| {
				StoreError::Json {
					file: self.name.clone(),
					source,
				}
			})?;
		}
		for (key, array) in &self.datasets.arrays {
			let zip_err = self.zip_err();
			self.zip
				.start_file(member(key), self.options)
				.map_err(zip_err)?;
			array
				.write_npy(&mut self.zip)
				.map_err(|source| StoreError::WriteNpy {
					file: self.name.clone(),
					key: key.clone(),
					source,
				})?;
			debug!(file = %self.name, key, "Wrote array");
		}
		let zip_err = self.zip_err();
		let mut writer = self.zip.finish().map_err(zip_err)?;
		writer.flush().map_err(|source| StoreError::Io {
			path: self.path.clone(),
			source,
		})?;
		Ok(writer)
	}
}

impl<W: Write + Seek> ArraySink for NpzWriter<W> {
	fn name(&self) -> &str {
		&self.name
	}
	fn set_attr(&mut self, key: &str, values: Vec<Scalar>) -> Result<(), StoreError> {
		self.attrs.insert(key.to_string(), values);
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
