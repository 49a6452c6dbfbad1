// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeSet, HashMap};

use super::info::{MappingInformation, OutlineCallsite, RewriteFrame};
use super::range::Range;
use super::signature::{FieldSignature, MethodSignature, Signature};
use crate::reference::TypeReference;

/// One method mapping line: a minified line range of a renamed method
/// mapped back to an original signature and line range.
///
/// Consecutive ranges with the same minified range describe one residual
/// position with inlined callees first and the outer-most caller last.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRange {
	pub minified_range: Option<Range>,
	pub signature: MethodSignature,
	pub original_range: Option<Range>,
	pub renamed_name: String,
	pub info: Vec<MappingInformation>,
}

impl MappedRange {
	/// Translates an obfuscated position into an original line.
	pub fn original_line_number(&self, position: i32) -> i32 {
		match (self.minified_range, self.original_range) {
			(_, None) => position,
			(None, Some(original)) => original.from,
			(Some(_), Some(original)) if original.is_cardinal() => original.from,
			(Some(minified), Some(original)) => original.from + (position - minified.from),
		}
	}

	pub fn first_position_of_original_range(&self, default: i32) -> i32 {
		self.original_range.map(|range| range.from).unwrap_or(default)
	}

	/// Synthesized and outline members never surface as frames of their own.
	pub fn is_compiler_synthesized(&self) -> bool {
		self.info.iter().any(|info| info.is_compiler_synthesized() || info.is_outline())
	}

	pub fn is_outline_frame(&self) -> bool {
		self.info.iter().any(MappingInformation::is_outline)
	}

	pub fn outline_callsite(&self) -> Option<&OutlineCallsite> {
		self.info.iter().find_map(|info| match info {
			MappingInformation::OutlineCallsite(callsite) => Some(callsite),
			_ => None,
		})
	}

	pub fn rewrite_frames(&self) -> impl Iterator<Item = &RewriteFrame> {
		self.info.iter().filter_map(|info| match info {
			MappingInformation::RewriteFrame(rewrite) => Some(rewrite),
			_ => None,
		})
	}
}

/// A renamed member and its original signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberNaming {
	pub original: Signature,
	pub renamed_name: String,
	pub info: Vec<MappingInformation>,
}

impl MemberNaming {
	/// Synthesized and outline members never surface as frames of their own.
	pub fn is_compiler_synthesized(&self) -> bool {
		self.info.iter().any(|info| info.is_compiler_synthesized() || info.is_outline())
	}

	pub fn is_outline_frame(&self) -> bool {
		self.info.iter().any(MappingInformation::is_outline)
	}
}

/// Everything a mapping says about one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNaming {
	original_name: String,
	renamed_name: String,
	info: Vec<MappingInformation>,
	mapped_ranges: HashMap<String, Vec<MappedRange>>,
	methods: HashMap<String, Vec<MemberNaming>>,
	fields: HashMap<String, Vec<MemberNaming>>,
}

impl ClassNaming {
	pub fn new(original_name: impl Into<String>, renamed_name: impl Into<String>) -> Self {
		Self {
			original_name: original_name.into(),
			renamed_name: renamed_name.into(),
			info: Vec::new(),
			mapped_ranges: HashMap::new(),
			methods: HashMap::new(),
			fields: HashMap::new(),
		}
	}

	pub fn original_name(&self) -> &str {
		&self.original_name
	}

	pub fn renamed_name(&self) -> &str {
		&self.renamed_name
	}

	pub fn info(&self) -> &[MappingInformation] {
		&self.info
	}

	pub fn source_file(&self) -> Option<&str> {
		self.info.iter().find_map(|info| match info {
			MappingInformation::SourceFile(file) => Some(file.as_str()),
			_ => None,
		})
	}

	pub fn is_compiler_synthesized(&self) -> bool {
		self.info.iter().any(MappingInformation::is_compiler_synthesized)
	}

	/// All mapped ranges of a renamed method name, in mapping order.
	pub fn mapped_ranges(&self, renamed_name: &str) -> &[MappedRange] {
		self.mapped_ranges
			.get(renamed_name)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Method members with the given renamed name.
	pub fn methods(&self, renamed_name: &str) -> &[MemberNaming] {
		self.methods.get(renamed_name).map(Vec::as_slice).unwrap_or_default()
	}

	/// Field members with the given renamed name.
	pub fn fields(&self, renamed_name: &str) -> &[MemberNaming] {
		self.fields.get(renamed_name).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn method_member(&self, renamed_name: &str, original: &MethodSignature) -> Option<&MemberNaming> {
		self.methods(renamed_name)
			.iter()
			.find(|member| member.original.as_method() == Some(original))
	}

	/// Original names of every type this class mentions, excluding primitives.
	pub fn referenced_types(&self) -> BTreeSet<String> {
		let mut types = BTreeSet::new();
		types.insert(self.original_name.clone());
		let mut add = |type_name: &str| {
			if let Some(class) = TypeReference::from_type_name(type_name).base_class() {
				types.insert(class.type_name().to_string());
			}
		};
		for ranges in self.mapped_ranges.values() {
			for range in ranges {
				range.signature.referenced_types().for_each(&mut add);
			}
		}
		for members in self.fields.values() {
			for member in members {
				if let Signature::Field(field) = &member.original {
					add(&field.field_type);
					if let Some(holder) = field.holder() {
						add(holder);
					}
				}
			}
		}
		types
	}

	pub(crate) fn add_info(&mut self, info: MappingInformation) {
		self.info.push(info);
	}

	pub(crate) fn add_mapped_range(&mut self, range: MappedRange) {
		self.mapped_ranges
			.entry(range.renamed_name.clone())
			.or_default()
			.push(range);
	}

	pub(crate) fn last_mapped_range_mut(&mut self, renamed_name: &str) -> Option<&mut MappedRange> {
		self.mapped_ranges.get_mut(renamed_name)?.last_mut()
	}

	pub(crate) fn add_field(&mut self, signature: FieldSignature, renamed_name: String) {
		self.fields.entry(renamed_name.clone()).or_default().push(MemberNaming {
			original: Signature::Field(signature),
			renamed_name,
			info: Vec::new(),
		});
	}

	pub(crate) fn last_field_mut(&mut self, renamed_name: &str) -> Option<&mut MemberNaming> {
		self.fields.get_mut(renamed_name)?.last_mut()
	}

	/// Derives method members from the mapped ranges.
	///
	/// The outer-most entry of each minified-range group is the method that
	/// still exists in the residual program; its signature names the member.
	pub(crate) fn finish(&mut self) {
		self.methods.clear();
		for (renamed_name, ranges) in &self.mapped_ranges {
			let members = self.methods.entry(renamed_name.clone()).or_default();
			for (index, range) in ranges.iter().enumerate() {
				let closes_group = match ranges.get(index + 1) {
					Some(next) => range.minified_range.is_none() || next.minified_range != range.minified_range,
					None => true,
				};
				if !closes_group {
					continue;
				}
				let original = Signature::Method(range.signature.clone());
				if members.iter().any(|member| member.original == original) {
					continue;
				}
				members.push(MemberNaming {
					original,
					renamed_name: renamed_name.clone(),
					info: range.info.clone(),
				});
			}
		}
	}
}
