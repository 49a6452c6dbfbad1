// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for retrace operations.

use std::path::PathBuf;

use loom_retrace_core::MappingError;
use loom_retrace_partition::PartitionError;
use thiserror::Error;

/// Errors that abort a retrace call.
///
/// Missing mapping data is never an error; unknown classes and members are
/// reported as unknown results instead.
#[derive(Debug, Error)]
pub enum RetraceError {
	#[error("Stack trace line {index} is null")]
	NullStackTraceLine { index: usize },

	#[error("Range starting at {start} registered after a range starting at {previous}")]
	OutOfOrderRange { previous: usize, start: usize },

	#[error("Range {start}..{end} does not fall on the line")]
	InvalidRange { start: usize, end: usize },

	#[error("Invalid stack trace template at offset {offset}: {message}")]
	InvalidTemplate { offset: usize, message: String },

	#[error("Invalid stack trace regular expression: {0}")]
	Regex(#[from] regex::Error),

	#[error("Mapping error: {0}")]
	Mapping(#[from] MappingError),

	#[error("Partition error: {0}")]
	Partition(#[from] PartitionError),

	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl RetraceError {
	pub fn invalid_template(offset: usize, message: impl Into<String>) -> Self {
		Self::InvalidTemplate {
			offset,
			message: message.into(),
		}
	}
}

/// Errors raised while loading retrace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Failed to read {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("Validation error: {0}")]
	Validation(String),
}

impl ConfigError {
	pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			key: key.into(),
			message: message.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, RetraceError>;
