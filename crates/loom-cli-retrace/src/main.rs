// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `loom-retrace` binary: retraces obfuscated stack traces and partitions
//! mapping files.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod diagnostics;
mod partitions;

use commands::partition::PartitionArgs;
use commands::retrace::RetraceArgs;

const DEFAULT_LOG_FILTER: &str = "loom_retrace=warn,loom_retrace_core=warn,loom_retrace_partition=warn";
const VERBOSE_LOG_FILTER: &str = "loom_retrace=debug,loom_retrace_core=debug,loom_retrace_partition=debug";

/// Loom retrace - map obfuscated stack traces back to original names.
#[derive(Parser, Debug)]
#[command(name = "loom-retrace", about = "Retrace obfuscated JVM stack traces", version)]
struct Cli {
	/// Log retrace internals to stderr (overridden by RUST_LOG)
	#[arg(long, global = true)]
	verbose_log: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Retrace a stack trace read from a file or stdin
	Retrace(RetraceArgs),
	/// Split a mapping file into per-class partitions
	Partition(PartitionArgs),
}

fn init_tracing(verbose: bool) {
	let default = if verbose {
		VERBOSE_LOG_FILTER
	} else {
		DEFAULT_LOG_FILTER
	};
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_tracing(cli.verbose_log);

	match cli.command {
		Command::Retrace(args) => commands::retrace::run(args),
		Command::Partition(args) => commands::partition::run(args),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn test_cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn test_retrace_requires_a_mapping_source() {
		assert!(Cli::try_parse_from(["loom-retrace", "retrace"]).is_err());
		assert!(Cli::try_parse_from(["loom-retrace", "retrace", "--mapping", "m.txt", "--partitions", "out"]).is_err());
		assert!(Cli::try_parse_from(["loom-retrace", "retrace", "--mapping", "m.txt", "trace.txt"]).is_ok());
	}

	#[test]
	fn test_global_verbose_log_flag() {
		let cli = Cli::try_parse_from([
			"loom-retrace",
			"partition",
			"--mapping",
			"m.txt",
			"--output",
			"out",
			"--verbose-log",
		])
		.unwrap();
		assert!(cli.verbose_log);
	}
}
