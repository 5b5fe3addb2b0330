//! Concatenates NPZ archives of named arrays along their rows and rebases index arrays
//!
//! # Command-line Interface
//!
//! ```text
//! Usage: npzcat [OPTIONS] <glob>...
//!
//! Arguments:
//!   <glob>...  Merges or checks input NPZ archives
//!
//! Options:
//!   -o, --output <path>        Writes output NPZ archive
//!   -f, --force                Writes existing output NPZ archive
//!   -i, --index <key>          Rebases values of this index array [default: event_hits_index]
//!   -c, --companion <key>      Counts rows of this array the index points into [default: hit_pmt]
//!       --no-reindex           Copies the index array verbatim
//!   -r, --recompress <method>  Writes arrays compressed [default: stored]
//!   -v, --verbose...           Prints status information
//!   -h, --help                 Print help (see more with '--help')
//!   -V, --version              Print version
//! ```

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use glob::glob as glob_expand;
use npzcat::{
	COMPANION_KEY, Compression, INDEX_KEY, IndexPair, MergeOptions, MergePlan, TracingObserver,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Concatenates NPZ archives of named arrays along their rows and rebases index arrays
///
/// All input NPZ archives must contain the same arrays and the same attributes. Arrays are
/// stacked along their first axis in the order the inputs are given, attributes are concatenated
/// into lists.
#[derive(Parser, Debug)]
#[command(version, about, arg_required_else_help = true)]
struct Npzcat {
	/// Merges or checks input NPZ archives.
	///
	/// Glob patterns are expanded in alphabetical order, patterns in the order given.
	#[arg(value_name = "glob", required = true)]
	inputs: Vec<String>,
	/// Writes output NPZ archive.
	///
	/// With no output NPZ archive, only checks if the input NPZ archives can be merged.
	#[arg(short, long, value_name = "path")]
	output: Option<PathBuf>,
	/// Writes existing output NPZ archive.
	#[arg(short, long)]
	force: bool,
	/// Rebases values of this index array.
	///
	/// Each value is shifted by the number of companion array rows in all preceding inputs.
	#[arg(short, long, value_name = "key", default_value = INDEX_KEY)]
	index: String,
	/// Counts rows of this array the index points into.
	#[arg(short, long, value_name = "key", default_value = COMPANION_KEY)]
	companion: String,
	/// Copies the index array verbatim.
	#[arg(long)]
	no_reindex: bool,
	/// Writes arrays compressed.
	///
	/// Supported methods are stored (uncompressed) and deflated.
	#[arg(short, long, value_name = "method", default_value = "stored")]
	recompress: Compression,
	/// Prints status information.
	///
	/// The more occurrences, the more verbose, with three at most. RUST_LOG takes precedence.
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

fn init_logging(verbose: u8) {
	let level = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn expand(globs: &[String]) -> Result<Vec<PathBuf>> {
	let mut paths = Vec::new();
	for glob in globs {
		let before = paths.len();
		let matches =
			glob_expand(glob).with_context(|| format!("Invalid glob pattern {glob:?}"))?;
		for path in matches {
			paths.push(path.with_context(|| format!("Cannot read matches of {glob:?}"))?);
		}
		if paths.len() == before {
			bail!("No input NPZ archive matches {glob:?}");
		}
	}
	Ok(paths)
}

fn ensure_not_input(output: &Path, inputs: &[PathBuf]) -> Result<()> {
	let Ok(output) = fs::canonicalize(output) else {
		return Ok(());
	};
	for input in inputs {
		if fs::canonicalize(input).is_ok_and(|input| input == output) {
			bail!("Output NPZ archive {output:?} is also an input");
		}
	}
	Ok(())
}

fn print_plan(plan: &MergePlan, out: &mut impl Write) -> io::Result<()> {
	for (key, shape) in &plan.shapes {
		writeln!(out, "{key}: {} {shape:?}", plan.dtypes[key])?;
	}
	Ok(())
}

fn main() -> Result<()> {
	let Npzcat {
		inputs,
		output,
		force,
		index,
		companion,
		no_reindex,
		recompress,
		verbose,
	} = Npzcat::parse();
	init_logging(verbose);
	let inputs = expand(&inputs)?;
	if let Some(output) = &output {
		ensure_not_input(output, &inputs)?;
	}
	let options = MergeOptions {
		reindex: (!no_reindex).then(|| IndexPair::new(index, companion)),
		compression: recompress,
		force,
	};
	let plan = npzcat::merge_files(&inputs, output.as_ref(), &options, &TracingObserver)
		.with_context(|| match &output {
			Some(output) => format!("Cannot merge into output NPZ archive {output:?}"),
			None => "Cannot merge input NPZ archives".to_string(),
		})?;
	if output.is_none() {
		info!(
			inputs = plan.files.len(),
			arrays = plan.keys.len(),
			attributes = plan.attr_keys.len(),
			"Input NPZ archives can be merged"
		);
		print_plan(&plan, &mut io::stdout().lock()).context("Cannot print merge plan")?;
	}
	Ok(())
}
