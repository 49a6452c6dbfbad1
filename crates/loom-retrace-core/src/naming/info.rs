// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Structured mapping information carried in `# {json}` comment lines.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::version::{MapVersion, MapVersionInfo};
use crate::reference::ClassReference;

const MAP_VERSION_ID: &str = "com.android.tools.r8.mapping";
const SOURCE_FILE_ID: &str = "sourceFile";
const SYNTHESIZED_ID: &str = "com.android.tools.r8.synthesized";
const OUTLINE_ID: &str = "com.android.tools.r8.outline";
const OUTLINE_CALLSITE_ID: &str = "com.android.tools.r8.outlineCallsite";
const REWRITE_FRAME_ID: &str = "com.android.tools.r8.rewriteFrame";

/// Identifier of the comment the partitioner prepends to each partition.
pub const PARTITION_SOURCE_FILES_ID: &str = "partitionSourceFiles";

/// One piece of structured information attached to the mapping, a class,
/// a member or a mapped range.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingInformation {
	MapVersion(MapVersionInfo),
	SourceFile(String),
	CompilerSynthesized,
	Outline,
	OutlineCallsite(OutlineCallsite),
	RewriteFrame(RewriteFrame),
	/// Source files of types referenced from a partition, keyed by original type name.
	PartitionSourceFiles(BTreeMap<String, String>),
	Unknown(Value),
}

/// Maps positions inside an outline back to positions at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineCallsite {
	pub positions: BTreeMap<i32, i32>,
	pub outline: Option<String>,
}

impl OutlineCallsite {
	pub fn rewrite_position(&self, position: i32) -> Option<i32> {
		self.positions.get(&position).copied()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteFrame {
	pub conditions: Vec<RewriteCondition>,
	pub actions: Vec<RewriteAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteCondition {
	/// Holds when the exception being unwound is the given class.
	Throws(ClassReference),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteAction {
	RemoveInnerFrames(usize),
}

impl RewriteFrame {
	pub fn matches(&self, thrown_exception: Option<&ClassReference>) -> bool {
		self.conditions.iter().all(|condition| match condition {
			RewriteCondition::Throws(class) => thrown_exception == Some(class),
		})
	}

	pub fn frames_to_remove(&self) -> usize {
		self.actions
			.iter()
			.map(|action| match action {
				RewriteAction::RemoveInnerFrames(count) => *count,
			})
			.sum()
	}
}

#[derive(Deserialize)]
struct RawMapVersion {
	version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceFile {
	file_name: String,
}

#[derive(Deserialize)]
struct RawOutlineCallsite {
	positions: BTreeMap<String, i32>,
	#[serde(default)]
	outline: Option<String>,
}

#[derive(Deserialize)]
struct RawRewriteFrame {
	conditions: Vec<String>,
	actions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPartitionSourceFiles {
	file_name_mapping: BTreeMap<String, String>,
}

impl MappingInformation {
	/// Decodes a JSON comment payload.
	///
	/// Kinds that require a newer map version than `version` decode as
	/// `Unknown`, as do payloads whose fields do not have the expected shape.
	pub fn from_json(value: Value, version: MapVersion) -> Self {
		let id = value.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
		let decoded = match id.as_str() {
			MAP_VERSION_ID => serde_json::from_value::<RawMapVersion>(value.clone()).ok().map(|raw| {
				MappingInformation::MapVersion(MapVersionInfo {
					version: MapVersion::from_name(&raw.version).unwrap_or(MapVersion::Unknown),
					value: raw.version,
				})
			}),
			SOURCE_FILE_ID => serde_json::from_value::<RawSourceFile>(value.clone())
				.ok()
				.map(|raw| MappingInformation::SourceFile(raw.file_name)),
			SYNTHESIZED_ID if version >= MapVersion::V1_0 => Some(MappingInformation::CompilerSynthesized),
			OUTLINE_ID if version >= MapVersion::V2_0 => Some(MappingInformation::Outline),
			OUTLINE_CALLSITE_ID if version >= MapVersion::V2_0 => {
				serde_json::from_value::<RawOutlineCallsite>(value.clone())
					.ok()
					.and_then(decode_outline_callsite)
			}
			REWRITE_FRAME_ID if version >= MapVersion::V2_0 => {
				serde_json::from_value::<RawRewriteFrame>(value.clone())
					.ok()
					.and_then(decode_rewrite_frame)
			}
			PARTITION_SOURCE_FILES_ID => serde_json::from_value::<RawPartitionSourceFiles>(value.clone())
				.ok()
				.map(|raw| MappingInformation::PartitionSourceFiles(raw.file_name_mapping)),
			_ => None,
		};
		match decoded {
			Some(info) => info,
			None => {
				if !id.is_empty() {
					warn!(id = %id, version = %version, "Unrecognised mapping information");
				}
				MappingInformation::Unknown(value)
			}
		}
	}

	/// Renders a partition source file annotation as a mapping comment line.
	pub fn partition_source_files_line(files: &BTreeMap<String, String>) -> String {
		let value = serde_json::json!({
			"id": PARTITION_SOURCE_FILES_ID,
			"fileNameMapping": files,
		});
		format!("# {value}")
	}

	pub fn is_compiler_synthesized(&self) -> bool {
		matches!(self, MappingInformation::CompilerSynthesized)
	}

	pub fn is_outline(&self) -> bool {
		matches!(self, MappingInformation::Outline)
	}
}

fn decode_outline_callsite(raw: RawOutlineCallsite) -> Option<MappingInformation> {
	let mut positions = BTreeMap::new();
	for (from, to) in raw.positions {
		positions.insert(from.parse::<i32>().ok()?, to);
	}
	Some(MappingInformation::OutlineCallsite(OutlineCallsite {
		positions,
		outline: raw.outline,
	}))
}

fn decode_rewrite_frame(raw: RawRewriteFrame) -> Option<MappingInformation> {
	let conditions = raw
		.conditions
		.iter()
		.map(|condition| {
			let descriptor = condition.strip_prefix("throws(")?.strip_suffix(')')?;
			ClassReference::from_descriptor(descriptor).map(RewriteCondition::Throws)
		})
		.collect::<Option<Vec<_>>>()?;
	let actions = raw
		.actions
		.iter()
		.map(|action| {
			let count = action.strip_prefix("removeInnerFrames(")?.strip_suffix(')')?;
			count.parse::<usize>().ok().map(RewriteAction::RemoveInnerFrames)
		})
		.collect::<Option<Vec<_>>>()?;
	Some(MappingInformation::RewriteFrame(RewriteFrame { conditions, actions }))
}
