// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use loom_retrace::{load_config, load_config_with_file, RetraceConfigLayer};
use loom_retrace_core::{ClassNameMapper, MapLineReader, ParseOptions};
use loom_retrace_partition::{MappingPartitioner, PartitionStrategy};
use tracing::{info, instrument};

use crate::partitions::DirectoryPartitions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
	/// Keys are obfuscated type names
	Plain,
	/// Keys are obfuscated type names and the metadata lists every key
	WithNames,
}

impl From<StrategyArg> for PartitionStrategy {
	fn from(strategy: StrategyArg) -> Self {
		match strategy {
			StrategyArg::Plain => PartitionStrategy::ObfuscatedTypeName,
			StrategyArg::WithNames => PartitionStrategy::ObfuscatedTypeNameWithPartitionNames,
		}
	}
}

#[derive(Debug, Clone, Args)]
pub struct PartitionArgs {
	/// Mapping file to split
	#[arg(long)]
	pub mapping: PathBuf,

	/// Directory receiving the metadata and partition files
	#[arg(long)]
	pub output: PathBuf,

	#[arg(long, value_enum, default_value_t = StrategyArg::WithNames)]
	pub strategy: StrategyArg,

	/// Config file to use instead of the user config
	#[arg(long)]
	pub config: Option<PathBuf>,
}

#[instrument(skip_all, fields(mapping = %args.mapping.display()))]
pub fn run(args: PartitionArgs) -> anyhow::Result<()> {
	let config = match &args.config {
		Some(path) => load_config_with_file(path, RetraceConfigLayer::default())?,
		None => load_config(RetraceConfigLayer::default())?,
	};
	let count = partition(
		&args.mapping,
		&args.output,
		args.strategy.into(),
		config.parse_options(),
		config.buffer_size,
	)?;
	println!("Wrote {count} partitions to {}", args.output.display());
	Ok(())
}

/// Writes every partition of `mapping` and the metadata into `output`.
/// Returns the number of partitions written.
fn partition(
	mapping: &Path,
	output: &Path,
	strategy: PartitionStrategy,
	parse_options: ParseOptions,
	buffer_size: usize,
) -> anyhow::Result<usize> {
	let open = || {
		MapLineReader::open(mapping, buffer_size).with_context(|| format!("failed to open {}", mapping.display()))
	};
	let full = ClassNameMapper::from_line_reader(&mut open()?, parse_options)
		.with_context(|| format!("failed to parse {}", mapping.display()))?;

	let directory = DirectoryPartitions::create(output)
		.with_context(|| format!("failed to create {}", output.display()))?;
	let mut count = 0;
	let metadata = MappingPartitioner::new(strategy)
		.with_parse_options(parse_options)
		.partition(&full, &mut open()?, |partition| {
			directory.write_partition(&partition)?;
			count += 1;
			Ok(())
		})?;
	directory.write_metadata(&metadata.serialize())?;
	info!(partitions = count, output = %directory.root().display(), "Wrote partitions");
	Ok(count)
}
