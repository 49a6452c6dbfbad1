// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_retrace_core::{ClassReference, MappedRange};

/// State carried from the retrace of one stack trace line to the next.
///
/// A context is never mutated; each step returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetraceStackTraceContext {
	thrown_exception: Option<ClassReference>,
	rewrite_position: Option<i32>,
}

impl RetraceStackTraceContext {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.thrown_exception.is_none() && self.rewrite_position.is_none()
	}

	/// The obfuscated class of the exception being unwound.
	pub fn thrown_exception(&self) -> Option<&ClassReference> {
		self.thrown_exception.as_ref()
	}

	/// Obfuscated position of a preceding outline frame.
	pub fn rewrite_position(&self) -> Option<i32> {
		self.rewrite_position
	}

	pub fn with_thrown_exception(&self, thrown_exception: ClassReference) -> Self {
		Self {
			thrown_exception: Some(thrown_exception),
			..self.clone()
		}
	}

	pub fn with_rewrite_position(&self, position: i32) -> Self {
		Self {
			rewrite_position: Some(position),
			..self.clone()
		}
	}

	pub fn without_rewrite_position(&self) -> Self {
		Self {
			rewrite_position: None,
			..self.clone()
		}
	}

	/// Number of inner frames to drop for a frame built from `ranges`.
	pub(crate) fn inner_frames_to_remove(&self, ranges: &[MappedRange]) -> usize {
		ranges
			.iter()
			.flat_map(MappedRange::rewrite_frames)
			.filter(|rewrite| rewrite.matches(self.thrown_exception()))
			.map(|rewrite| rewrite.frames_to_remove())
			.sum()
	}
}
