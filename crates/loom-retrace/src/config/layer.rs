// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// A partial retrace configuration as read from one source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetraceConfigLayer {
	pub verbose: Option<bool>,
	pub regex: Option<String>,
	pub buffer_size: Option<usize>,
	pub use_mmap: Option<bool>,
	pub load_all_definitions: Option<bool>,
	pub allow_experimental: Option<bool>,
}

impl RetraceConfigLayer {
	/// Values set in `other` override those in `self`.
	pub fn merge(&mut self, other: Self) {
		if other.verbose.is_some() {
			self.verbose = other.verbose;
		}
		if other.regex.is_some() {
			self.regex = other.regex;
		}
		if other.buffer_size.is_some() {
			self.buffer_size = other.buffer_size;
		}
		if other.use_mmap.is_some() {
			self.use_mmap = other.use_mmap;
		}
		if other.load_all_definitions.is_some() {
			self.load_all_definitions = other.load_all_definitions;
		}
		if other.allow_experimental.is_some() {
			self.allow_experimental = other.allow_experimental;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_later_layer_wins() {
		let mut base = RetraceConfigLayer {
			verbose: Some(false),
			buffer_size: Some(1024),
			..Default::default()
		};
		base.merge(RetraceConfigLayer {
			verbose: Some(true),
			use_mmap: Some(false),
			..Default::default()
		});
		assert_eq!(base.verbose, Some(true));
		assert_eq!(base.buffer_size, Some(1024));
		assert_eq!(base.use_mmap, Some(false));
		assert_eq!(base.regex, None);
	}

	#[test]
	fn test_deserialize_from_toml() {
		let layer: RetraceConfigLayer = toml::from_str("verbose = true\nregex = '%c'\nbuffer_size = 4096\n").unwrap();
		assert_eq!(layer.verbose, Some(true));
		assert_eq!(layer.regex.as_deref(), Some("%c"));
		assert_eq!(layer.buffer_size, Some(4096));
	}

	#[test]
	fn test_unknown_keys_are_rejected() {
		assert!(toml::from_str::<RetraceConfigLayer>("verbosity = 1\n").is_err());
	}
}
