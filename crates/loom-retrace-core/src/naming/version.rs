// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

/// Version of the mapping file format.
///
/// `Unknown` is used when a mapping carries no version marker at all and
/// orders below every concrete version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MapVersion {
	#[default]
	Unknown,
	None,
	V1_0,
	V2_0,
	V2_1,
	V2_2,
	Experimental,
}

impl MapVersion {
	pub const ALL: [MapVersion; 7] = [
		MapVersion::Unknown,
		MapVersion::None,
		MapVersion::V1_0,
		MapVersion::V2_0,
		MapVersion::V2_1,
		MapVersion::V2_2,
		MapVersion::Experimental,
	];

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|version| version.name() == name)
	}

	pub fn name(&self) -> &'static str {
		match self {
			MapVersion::Unknown => "unknown",
			MapVersion::None => "none",
			MapVersion::V1_0 => "1.0",
			MapVersion::V2_0 => "2.0",
			MapVersion::V2_1 => "2.1",
			MapVersion::V2_2 => "2.2",
			MapVersion::Experimental => "experimental",
		}
	}

	pub fn is_unknown(&self) -> bool {
		*self == MapVersion::Unknown
	}
}

impl fmt::Display for MapVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A map version marker as it appeared in a mapping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapVersionInfo {
	pub version: MapVersion,
	pub value: String,
}

impl MapVersionInfo {
	pub fn new(version: MapVersion) -> Self {
		Self {
			version,
			value: version.name().to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_names_round_trip() {
		for version in MapVersion::ALL {
			assert_eq!(MapVersion::from_name(version.name()), Some(version));
		}
		assert_eq!(MapVersion::from_name("3.7"), None);
	}

	#[test]
	fn test_ordering() {
		assert!(MapVersion::V2_0 > MapVersion::V1_0);
		assert!(MapVersion::Unknown < MapVersion::None);
		assert!(MapVersion::Experimental > MapVersion::V2_2);
	}
}
