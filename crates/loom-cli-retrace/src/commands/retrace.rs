// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Args};
use loom_retrace::{
	load_config, load_config_with_file, EagerMappingSupplier, MappingSupplier, PartitionedMappingSupplier,
	RetraceConfig, RetraceConfigLayer, RetraceStackTraceContext, StackTraceRetracer,
};
use tracing::{debug, instrument};

use crate::diagnostics::StderrDiagnostics;
use crate::partitions::DirectoryPartitions;

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["mapping", "partitions"])))]
pub struct RetraceArgs {
	/// Mapping file produced by the obfuscator
	#[arg(long)]
	pub mapping: Option<PathBuf>,

	/// Directory written by `loom-retrace partition`
	#[arg(long)]
	pub partitions: Option<PathBuf>,

	/// Line template using %c %C %m %f %s %l %S %t %a directives
	#[arg(long)]
	pub regex: Option<String>,

	/// Print full method signatures and keep alternatives that only differ
	/// in signature
	#[arg(long)]
	pub verbose: bool,

	/// Suppress informational diagnostics
	#[arg(long)]
	pub quiet: bool,

	/// Config file to use instead of the user config
	#[arg(long)]
	pub config: Option<PathBuf>,

	/// Stack trace to retrace; stdin when omitted
	pub stacktrace: Option<PathBuf>,
}

impl RetraceArgs {
	fn overrides(&self) -> RetraceConfigLayer {
		RetraceConfigLayer {
			verbose: self.verbose.then_some(true),
			regex: self.regex.clone(),
			..Default::default()
		}
	}

	fn config(&self) -> anyhow::Result<RetraceConfig> {
		let config = match &self.config {
			Some(path) => load_config_with_file(path, self.overrides())?,
			None => load_config(self.overrides())?,
		};
		Ok(config)
	}

	fn read_stacktrace(&self) -> anyhow::Result<String> {
		match &self.stacktrace {
			Some(path) => {
				std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
			}
			None => {
				let mut text = String::new();
				io::stdin()
					.read_to_string(&mut text)
					.context("failed to read stack trace from stdin")?;
				Ok(text)
			}
		}
	}
}

#[instrument(skip_all)]
pub fn run(args: RetraceArgs) -> anyhow::Result<()> {
	let config = args.config()?;
	let text = args.read_stacktrace()?;
	let diagnostics = Arc::new(StderrDiagnostics::new(args.quiet));

	let lines = match (&args.mapping, &args.partitions) {
		(Some(mapping), _) => {
			debug!(mapping = %mapping.display(), "Retracing with a mapping file");
			let supplier = EagerMappingSupplier::new(config.mapping_source(mapping))
				.with_load_all_definitions(config.load_all_definitions)
				.with_parse_options(config.parse_options());
			retrace(supplier, &config, diagnostics, &text)?
		}
		(None, Some(dir)) => {
			debug!(partitions = %dir.display(), "Retracing with partitions");
			let partitions = DirectoryPartitions::new(dir);
			let metadata = partitions
				.read_metadata()
				.with_context(|| format!("failed to read partition metadata in {}", dir.display()))?;
			let supplier = PartitionedMappingSupplier::new(metadata, partitions)?
				.with_allow_experimental(config.allow_experimental);
			retrace(supplier, &config, diagnostics, &text)?
		}
		(None, None) => anyhow::bail!("either --mapping or --partitions is required"),
	};

	let mut out = BufWriter::new(io::stdout().lock());
	for line in lines {
		writeln!(out, "{line}")?;
	}
	out.flush()?;
	Ok(())
}

fn retrace<S: MappingSupplier>(
	supplier: S,
	config: &RetraceConfig,
	diagnostics: Arc<StderrDiagnostics>,
	text: &str,
) -> anyhow::Result<Vec<String>> {
	let mut retracer = StackTraceRetracer::from_config(supplier, config)?.with_diagnostics(diagnostics);
	let result = retracer.retrace_str(text, &RetraceStackTraceContext::empty())?;
	Ok(result.render())
}
