// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Metadata that defers decoding partition keys and additional info.
//!
//! The header is validated up front, so a value that constructs can only
//! fail later on content errors (invalid UTF-8, a malformed element inside
//! the additional info block). Decoded sections are memoized and shared.

use std::collections::BTreeSet;
use std::sync::Arc;

use loom_retrace_core::{ClassReference, MapVersion};
use once_cell::sync::OnceCell;

use crate::codec::ByteReader;
use crate::error::Result;
use crate::metadata::{decode_keys, AdditionalInfo, FramedSections, Header, PartitionMetadata, PartitionStrategy};

#[derive(Debug)]
pub struct LazyPartitionMetadata {
	bytes: Arc<[u8]>,
	map_version: MapVersion,
	framed: Option<FramedSections>,
	partition_keys: OnceCell<BTreeSet<String>>,
	additional_info: OnceCell<AdditionalInfo>,
}

impl LazyPartitionMetadata {
	pub fn new(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
		let bytes = bytes.into();
		let header = Header::parse(&bytes)?;
		Ok(Self {
			bytes,
			map_version: header.map_version,
			framed: header.framed,
			partition_keys: OnceCell::new(),
			additional_info: OnceCell::new(),
		})
	}

	pub fn strategy(&self) -> PartitionStrategy {
		match self.framed {
			Some(_) => PartitionStrategy::ObfuscatedTypeNameWithPartitionNames,
			None => PartitionStrategy::ObfuscatedTypeName,
		}
	}

	pub fn map_version(&self) -> MapVersion {
		self.map_version
	}

	pub fn key_for(&self, class: &ClassReference) -> String {
		class.type_name().to_string()
	}

	/// Decodes the partition key set on first access.
	pub fn partition_keys(&self) -> Result<Option<&BTreeSet<String>>> {
		let Some(framed) = self.framed else {
			return Ok(None);
		};
		self.partition_keys
			.get_or_try_init(|| decode_keys(&self.bytes, framed.keys))
			.map(Some)
	}

	/// Decodes the additional info block on first access.
	pub fn additional_info(&self) -> Result<Option<&AdditionalInfo>> {
		let Some(framed) = self.framed else {
			return Ok(None);
		};
		self.additional_info
			.get_or_try_init(|| AdditionalInfo::decode(&mut ByteReader::at(&self.bytes, framed.additional_info)))
			.map(Some)
	}

	/// Fully decodes into the eager representation.
	pub fn to_metadata(&self) -> Result<PartitionMetadata> {
		Ok(match self.framed {
			None => PartitionMetadata::ObfuscatedTypeName {
				map_version: self.map_version,
			},
			Some(_) => PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
				map_version: self.map_version,
				partition_keys: self.partition_keys()?.cloned().unwrap_or_default(),
				additional_info: self.additional_info()?.cloned().unwrap_or_default(),
			},
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::PartitionError;
	use proptest::prelude::*;

	fn framed() -> PartitionMetadata {
		PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
			map_version: MapVersion::V2_1,
			partition_keys: ["a.a", "a.b", "b"].iter().map(|key| key.to_string()).collect(),
			additional_info: AdditionalInfo::with_preamble(vec!["# compiler: R8".into()]),
		}
	}

	#[test]
	fn test_lazy_matches_eager() {
		let eager = framed();
		let lazy = LazyPartitionMetadata::new(eager.serialize()).unwrap();
		assert_eq!(lazy.strategy(), eager.strategy());
		assert_eq!(lazy.map_version(), MapVersion::V2_1);
		assert_eq!(lazy.partition_keys().unwrap(), eager.partition_keys());
		assert_eq!(lazy.additional_info().unwrap(), eager.additional_info());
		assert_eq!(lazy.to_metadata().unwrap(), eager);
	}

	#[test]
	fn test_memoized_values_are_shared() {
		let lazy = LazyPartitionMetadata::new(framed().serialize()).unwrap();
		let first = lazy.partition_keys().unwrap().unwrap() as *const _;
		let second = lazy.partition_keys().unwrap().unwrap() as *const _;
		assert_eq!(first, second);
	}

	#[test]
	fn test_bare_metadata_has_no_sections() {
		let eager = PartitionMetadata::ObfuscatedTypeName {
			map_version: MapVersion::None,
		};
		let lazy = LazyPartitionMetadata::new(eager.serialize()).unwrap();
		assert_eq!(lazy.partition_keys().unwrap(), None);
		assert_eq!(lazy.additional_info().unwrap(), None);
		assert_eq!(lazy.to_metadata().unwrap(), eager);
	}

	#[test]
	fn test_header_errors_surface_on_construction() {
		let error = LazyPartitionMetadata::new(vec![0x00, 0x05]).unwrap_err();
		assert!(matches!(error, PartitionError::UnknownStrategy(5)));
	}

	#[test]
	fn test_concurrent_first_access() {
		let lazy = Arc::new(LazyPartitionMetadata::new(framed().serialize()).unwrap());
		let handles: Vec<_> = (0..4)
			.map(|_| {
				let lazy = Arc::clone(&lazy);
				std::thread::spawn(move || lazy.partition_keys().unwrap().cloned())
			})
			.collect();
		for handle in handles {
			assert_eq!(handle.join().unwrap().as_ref(), framed().partition_keys());
		}
	}

	proptest! {
		#[test]
		fn test_lazy_round_trip(
			keys in prop::collection::btree_set("[a-z]{1,6}", 0..6),
			preamble in prop::option::of(prop::collection::vec("[a-z #]{0,10}", 0..4)),
		) {
			let eager = PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
				map_version: MapVersion::V2_2,
				partition_keys: keys,
				additional_info: AdditionalInfo { preamble },
			};
			let lazy = LazyPartitionMetadata::new(eager.serialize()).unwrap();
			prop_assert_eq!(lazy.to_metadata().unwrap(), eager);
		}
	}
}
