// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

/// An inclusive line range.
///
/// A cardinal range comes from a single original line (`...():42`) and maps
/// every minified position to that one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
	pub from: i32,
	pub to: i32,
	cardinal: bool,
}

impl Range {
	pub fn new(from: i32, to: i32) -> Self {
		Self {
			from,
			to,
			cardinal: false,
		}
	}

	pub fn cardinal(line: i32) -> Self {
		Self {
			from: line,
			to: line,
			cardinal: true,
		}
	}

	pub fn is_cardinal(&self) -> bool {
		self.cardinal
	}

	/// Number of lines covered.
	pub fn span(&self) -> i64 {
		i64::from(self.to) - i64::from(self.from) + 1
	}

	pub fn contains(&self, position: i32) -> bool {
		self.from <= position && position <= self.to
	}
}

impl fmt::Display for Range {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.cardinal {
			write!(f, "{}", self.from)
		} else {
			write!(f, "{}:{}", self.from, self.to)
		}
	}
}
