// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for mapping reading.

use thiserror::Error;

/// Errors that can occur while reading a mapping.
#[derive(Debug, Error)]
pub enum MappingError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid mapping at line {line}: {message}")]
	Parse { line: usize, message: String },

	#[error("Member mapping at line {line} appears before any class mapping")]
	MemberOutsideClass { line: usize },
}

impl MappingError {
	pub fn parse(line: usize, message: impl Into<String>) -> Self {
		Self::Parse {
			line,
			message: message.into(),
		}
	}
}

pub type Result<T> = std::result::Result<T, MappingError>;
