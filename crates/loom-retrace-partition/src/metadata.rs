// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Binary partition metadata.
//!
//! Two layouts exist. The bare layout predates partition names:
//!
//! ```text
//! <strategy:u16 = 0><map version, raw UTF-8 to end of input>
//! ```
//!
//! The framed layout starts with the magic marker `0xAA 0xA8`:
//!
//! ```text
//! <0xAA 0xA8><strategy:u16 = 1>
//! <len:i32><map version>
//! <len:i32><partition keys joined by ';'>
//! <total:i32><count:i16> { <tag:i16><len:i32><payload> }*
//! ```
//!
//! `total` counts the bytes after the field itself. The only defined
//! additional-info tag is the preamble, whose payload is an `i32`-prefixed
//! newline-joined UTF-8 block, or nothing at all for an empty preamble.
//! Unknown tags are skipped by length.
//!
//! Partition keys are obfuscated type names, so they are never empty and
//! never contain `;`.

use std::collections::BTreeSet;

use bytes::BufMut;
use loom_retrace_core::{ClassReference, MapVersion};
use tracing::debug;

use crate::codec::{put_block, put_string, ByteReader};
use crate::error::{PartitionError, Result};

pub(crate) const MAGIC: [u8; 2] = [0xAA, 0xA8];
pub(crate) const PREAMBLE_TAG: i16 = 0;
pub(crate) const KEY_SEPARATOR: char = ';';

/// How partition keys are derived and which extra data is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStrategy {
	/// Keys are obfuscated type names; nothing else is recorded.
	ObfuscatedTypeName,
	/// Keys are obfuscated type names; the key set and additional info are recorded.
	ObfuscatedTypeNameWithPartitionNames,
}

impl PartitionStrategy {
	pub fn id(&self) -> u16 {
		match self {
			PartitionStrategy::ObfuscatedTypeName => 0,
			PartitionStrategy::ObfuscatedTypeNameWithPartitionNames => 1,
		}
	}

	pub fn from_id(id: u16) -> Option<Self> {
		match id {
			0 => Some(PartitionStrategy::ObfuscatedTypeName),
			1 => Some(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames),
			_ => None,
		}
	}
}

/// Extra data carried by framed metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalInfo {
	pub preamble: Option<Vec<String>>,
}

impl AdditionalInfo {
	pub fn with_preamble(preamble: Vec<String>) -> Self {
		Self {
			preamble: Some(preamble),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.preamble.is_none()
	}

	pub(crate) fn encode(&self, out: &mut Vec<u8>) {
		let mut elements = Vec::new();
		let mut count: i16 = 0;
		if let Some(preamble) = &self.preamble {
			let mut payload = Vec::new();
			if !preamble.is_empty() {
				put_string(&mut payload, &preamble.join("\n"));
			}
			elements.put_i16(PREAMBLE_TAG);
			put_block(&mut elements, &payload);
			count += 1;
		}
		out.put_i32((elements.len() + 2) as i32);
		out.put_i16(count);
		out.put_slice(&elements);
	}

	/// Decodes a block starting at its `total` field.
	pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
		let total = reader.read_len("additional info")?;
		let end = reader.position() + total;
		let count = reader.read_i16("additional info count")?;
		if count < 0 {
			return Err(PartitionError::malformed(format!("negative additional info count {count}")));
		}
		let mut info = AdditionalInfo::default();
		for _ in 0..count {
			let tag = reader.read_i16("additional info tag")?;
			let len = reader.read_len("additional info payload")?;
			let payload = reader.read_bytes(len, "additional info payload")?;
			match tag {
				PREAMBLE_TAG if payload.is_empty() => info.preamble = Some(Vec::new()),
				PREAMBLE_TAG => {
					let mut payload_reader = ByteReader::new(payload);
					let text = payload_reader.read_string("preamble")?;
					info.preamble = Some(text.split('\n').map(str::to_string).collect());
				}
				unknown => debug!(tag = unknown, len, "Skipping unknown additional info"),
			}
		}
		if reader.position() != end {
			return Err(PartitionError::malformed(format!(
				"additional info length {total} does not match its {} element(s)",
				count
			)));
		}
		Ok(info)
	}
}

/// Describes how to interpret a set of mapping partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionMetadata {
	ObfuscatedTypeName {
		map_version: MapVersion,
	},
	ObfuscatedTypeNameWithPartitionNames {
		map_version: MapVersion,
		/// Non-empty obfuscated type names.
		partition_keys: BTreeSet<String>,
		additional_info: AdditionalInfo,
	},
}

impl PartitionMetadata {
	pub fn strategy(&self) -> PartitionStrategy {
		match self {
			PartitionMetadata::ObfuscatedTypeName { .. } => PartitionStrategy::ObfuscatedTypeName,
			PartitionMetadata::ObfuscatedTypeNameWithPartitionNames { .. } => {
				PartitionStrategy::ObfuscatedTypeNameWithPartitionNames
			}
		}
	}

	pub fn map_version(&self) -> MapVersion {
		match self {
			PartitionMetadata::ObfuscatedTypeName { map_version }
			| PartitionMetadata::ObfuscatedTypeNameWithPartitionNames { map_version, .. } => *map_version,
		}
	}

	pub fn partition_keys(&self) -> Option<&BTreeSet<String>> {
		match self {
			PartitionMetadata::ObfuscatedTypeName { .. } => None,
			PartitionMetadata::ObfuscatedTypeNameWithPartitionNames { partition_keys, .. } => {
				Some(partition_keys)
			}
		}
	}

	pub fn additional_info(&self) -> Option<&AdditionalInfo> {
		match self {
			PartitionMetadata::ObfuscatedTypeName { .. } => None,
			PartitionMetadata::ObfuscatedTypeNameWithPartitionNames { additional_info, .. } => {
				Some(additional_info)
			}
		}
	}

	/// Partition key holding the mapping of an obfuscated class.
	pub fn key_for(&self, class: &ClassReference) -> String {
		class.type_name().to_string()
	}

	pub fn serialize(&self) -> Vec<u8> {
		let mut out = Vec::new();
		match self {
			PartitionMetadata::ObfuscatedTypeName { map_version } => {
				out.put_u16(PartitionStrategy::ObfuscatedTypeName.id());
				out.put_slice(map_version.name().as_bytes());
			}
			PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
				map_version,
				partition_keys,
				additional_info,
			} => {
				out.put_slice(&MAGIC);
				out.put_u16(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames.id());
				put_string(&mut out, map_version.name());
				let keys: Vec<&str> = partition_keys.iter().map(String::as_str).collect();
				put_string(&mut out, &keys.join(&KEY_SEPARATOR.to_string()));
				additional_info.encode(&mut out);
			}
		}
		out
	}

	pub fn deserialize(bytes: &[u8]) -> Result<Self> {
		let header = Header::parse(bytes)?;
		match header.framed {
			None => Ok(PartitionMetadata::ObfuscatedTypeName {
				map_version: header.map_version,
			}),
			Some(framed) => Ok(PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
				map_version: header.map_version,
				partition_keys: decode_keys(bytes, framed.keys)?,
				additional_info: AdditionalInfo::decode(&mut ByteReader::at(bytes, framed.additional_info))?,
			}),
		}
	}

	/// Decodes `bytes`, or falls back to bare metadata when there are none.
	pub fn deserialize_or_default(bytes: Option<&[u8]>, fallback: MapVersion) -> Result<Self> {
		match bytes {
			Some(bytes) => Self::deserialize(bytes),
			None => Ok(PartitionMetadata::ObfuscatedTypeName { map_version: fallback }),
		}
	}
}

/// Offsets of the lazily decodable sections of framed metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FramedSections {
	/// Payload range of the partition key string.
	pub(crate) keys: (usize, usize),
	/// Offset of the additional info `total` field.
	pub(crate) additional_info: usize,
}

/// The eagerly decoded part of any metadata encoding.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
	pub(crate) map_version: MapVersion,
	pub(crate) framed: Option<FramedSections>,
}

impl Header {
	pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < 2 {
			return Err(PartitionError::malformed("metadata shorter than its strategy tag"));
		}
		let marker = u32::from_be_bytes([0, 0, bytes[0], bytes[1]]);
		if marker != u32::from(u16::from_be_bytes(MAGIC)) {
			let mut reader = ByteReader::new(bytes);
			let strategy = reader.read_u16("strategy")?;
			return match PartitionStrategy::from_id(strategy) {
				Some(PartitionStrategy::ObfuscatedTypeName) => {
					let name = std::str::from_utf8(reader.rest())?;
					Ok(Header {
						map_version: parse_map_version(name),
						framed: None,
					})
				}
				_ => Err(PartitionError::UnknownStrategy(strategy)),
			};
		}

		let mut reader = ByteReader::at(bytes, MAGIC.len());
		let strategy = reader.read_u16("strategy")?;
		if PartitionStrategy::from_id(strategy) != Some(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames) {
			return Err(PartitionError::UnknownStrategy(strategy));
		}
		let map_version = parse_map_version(reader.read_string("map version")?);
		let keys = reader.skip_block("partition keys")?;
		let additional_info = reader.position();
		// Validate the outer framing now so lazy readers never see a truncated block.
		let total = reader.read_len("additional info")?;
		reader.read_bytes(total, "additional info")?;
		if reader.remaining() != 0 {
			return Err(PartitionError::malformed(format!(
				"{} trailing byte(s) after additional info",
				reader.remaining()
			)));
		}
		Ok(Header {
			map_version,
			framed: Some(FramedSections { keys, additional_info }),
		})
	}
}

fn parse_map_version(name: &str) -> MapVersion {
	MapVersion::from_name(name).unwrap_or_else(|| {
		debug!(name, "Unrecognised map version in partition metadata");
		MapVersion::Unknown
	})
}

pub(crate) fn decode_keys(bytes: &[u8], (start, end): (usize, usize)) -> Result<BTreeSet<String>> {
	let joined = std::str::from_utf8(&bytes[start..end])?;
	if joined.is_empty() {
		return Ok(BTreeSet::new());
	}
	Ok(joined.split(KEY_SEPARATOR).map(str::to_string).collect())
}
