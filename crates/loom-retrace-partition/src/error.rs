// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for partitioning and partition metadata.

use loom_retrace_core::MappingError;
use thiserror::Error;

/// Errors that can occur while partitioning a mapping or decoding metadata.
#[derive(Debug, Error)]
pub enum PartitionError {
	#[error("Unknown partition key strategy: {0}")]
	UnknownStrategy(u16),

	#[error("Malformed partition metadata: {0}")]
	Malformed(String),

	#[error("Partition metadata contains invalid UTF-8")]
	InvalidUtf8(#[from] std::str::Utf8Error),

	#[error("Partition {key} contains {count} class mappings, expected exactly one")]
	MultipleClassMappings { key: String, count: usize },

	#[error("Mapping error: {0}")]
	Mapping(#[from] MappingError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl PartitionError {
	pub fn malformed(message: impl Into<String>) -> Self {
		Self::Malformed(message.into())
	}
}

pub type Result<T> = std::result::Result<T, PartitionError>;
