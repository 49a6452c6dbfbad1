// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Splits a full mapping into one partition per obfuscated class.

use std::collections::{BTreeMap, BTreeSet};

use loom_retrace_core::{
	is_class_header, ClassNameMapper, LineReader, MapLineReader, MapVersion, MappingInformation,
	ParseOptions,
};
use tracing::{debug, info, instrument};

use crate::error::{PartitionError, Result};
use crate::metadata::{AdditionalInfo, PartitionMetadata, PartitionStrategy};

/// One addressable fragment of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPartition {
	pub key: String,
	pub payload: Vec<u8>,
}

/// Produces [`MappingPartition`]s and the matching [`PartitionMetadata`].
#[derive(Debug, Clone)]
pub struct MappingPartitioner {
	strategy: PartitionStrategy,
	parse_options: ParseOptions,
}

impl MappingPartitioner {
	pub fn new(strategy: PartitionStrategy) -> Self {
		Self {
			strategy,
			parse_options: ParseOptions::default(),
		}
	}

	pub fn with_parse_options(mut self, parse_options: ParseOptions) -> Self {
		self.parse_options = parse_options;
		self
	}

	/// Partitions a mapping held in memory.
	pub fn partition_str<F>(&self, text: &str, consumer: F) -> Result<PartitionMetadata>
	where
		F: FnMut(MappingPartition) -> Result<()>,
	{
		let full = ClassNameMapper::parse_str_with(text, self.parse_options)?;
		let mut lines = MapLineReader::stream(text.as_bytes());
		self.partition(&full, &mut lines, consumer)
	}

	/// Partitions the raw text in `lines`, using `full` (the parse of the
	/// same text) to resolve source files of referenced types.
	///
	/// Partitions are handed to `consumer` in mapping order.
	#[instrument(skip_all, fields(strategy = ?self.strategy))]
	pub fn partition<F>(
		&self,
		full: &ClassNameMapper,
		lines: &mut dyn LineReader,
		mut consumer: F,
	) -> Result<PartitionMetadata>
	where
		F: FnMut(MappingPartition) -> Result<()>,
	{
		let map_version = full
			.first_map_version()
			.map(|info| info.version)
			.unwrap_or(MapVersion::Unknown);
		let fragment_options = ParseOptions {
			map_version,
			..self.parse_options
		};

		let mut keys = BTreeSet::new();
		let mut fragment: Option<String> = None;
		while let Some(line) = lines.read_line()? {
			if is_class_header(&line) {
				if let Some(text) = fragment.take() {
					let partition = build_partition(full, &text, fragment_options)?;
					keys.insert(partition.key.clone());
					consumer(partition)?;
				}
				fragment = Some(String::new());
			}
			if let Some(text) = fragment.as_mut() {
				text.push_str(&line);
				text.push('\n');
			}
		}
		if let Some(text) = fragment.take() {
			let partition = build_partition(full, &text, fragment_options)?;
			keys.insert(partition.key.clone());
			consumer(partition)?;
		}
		lines.close()?;

		info!(partitions = keys.len(), map_version = %map_version, "Partitioned mapping");
		Ok(match self.strategy {
			PartitionStrategy::ObfuscatedTypeName => PartitionMetadata::ObfuscatedTypeName { map_version },
			PartitionStrategy::ObfuscatedTypeNameWithPartitionNames => {
				PartitionMetadata::ObfuscatedTypeNameWithPartitionNames {
					map_version,
					partition_keys: keys,
					additional_info: AdditionalInfo::with_preamble(full.preamble().to_vec()),
				}
			}
		})
	}
}

fn build_partition(full: &ClassNameMapper, text: &str, options: ParseOptions) -> Result<MappingPartition> {
	let fragment = ClassNameMapper::parse_str_with(text, options)?;
	let Some(naming) = fragment.classes().next().filter(|_| fragment.len() == 1) else {
		let key = fragment
			.classes()
			.next()
			.map(|naming| naming.renamed_name().to_string())
			.unwrap_or_default();
		return Err(PartitionError::MultipleClassMappings {
			key,
			count: fragment.len(),
		});
	};

	let mut files = BTreeMap::new();
	for type_name in naming.referenced_types() {
		if fragment.source_file_for(&type_name).is_some() {
			continue;
		}
		if let Some(file) = full.source_file_for(&type_name) {
			files.insert(type_name, file.to_string());
		}
	}

	let mut payload = String::with_capacity(text.len());
	if !files.is_empty() {
		payload.push_str(&MappingInformation::partition_source_files_line(&files));
		payload.push('\n');
	}
	payload.push_str(text);
	debug!(key = naming.renamed_name(), bytes = payload.len(), source_files = files.len(), "Built partition");
	Ok(MappingPartition {
		key: naming.renamed_name().to_string(),
		payload: payload.into_bytes(),
	})
}
