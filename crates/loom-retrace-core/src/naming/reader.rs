// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reader for ProGuard/R8 mapping text.
//!
//! ```text
//! # {"id":"com.android.tools.r8.mapping","version":"2.0"}
//! com.example.Foo -> a.a:
//! # {"id":"sourceFile","fileName":"Foo.kt"}
//!     int count -> a
//!     1:3:void inlinee():5:7 -> b
//!     1:3:void caller():42 -> b
//! ```

use tracing::{debug, instrument};

use super::class::{ClassNaming, MappedRange};
use super::info::MappingInformation;
use super::mapper::ClassNameMapper;
use super::range::Range;
use super::signature::{FieldSignature, MethodSignature};
use super::version::MapVersion;
use crate::error::{MappingError, Result};
use crate::line_reader::{LineReader, MapLineReader};

/// Options for reading a mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
	/// Version assumed until the mapping declares its own.
	pub map_version: MapVersion,
	/// Honour an `experimental` version marker instead of treating it as `none`.
	pub allow_experimental: bool,
}

/// Where the next JSON comment attaches.
enum Target {
	Mapping,
	Class,
	Field(String),
	MethodRange(String),
}

struct MappingParser {
	options: ParseOptions,
	version: MapVersion,
	mapper: ClassNameMapper,
	current: Option<ClassNaming>,
	target: Target,
	seen_class: bool,
}

impl ClassNameMapper {
	/// Parses a complete mapping held in memory.
	pub fn parse_str(text: &str) -> Result<Self> {
		Self::parse_str_with(text, ParseOptions::default())
	}

	pub fn parse_str_with(text: &str, options: ParseOptions) -> Result<Self> {
		let mut reader = MapLineReader::stream(text.as_bytes());
		Self::from_line_reader(&mut reader, options)
	}

	/// Parses every line produced by `reader`.
	#[instrument(skip(reader))]
	pub fn from_line_reader(reader: &mut dyn LineReader, options: ParseOptions) -> Result<Self> {
		let mut parser = MappingParser {
			options,
			version: options.map_version,
			mapper: ClassNameMapper::new(),
			current: None,
			target: Target::Mapping,
			seen_class: false,
		};
		let mut line_number = 0;
		while let Some(line) = reader.read_line()? {
			line_number += 1;
			parser.parse_line(&line, line_number)?;
		}
		let mapper = parser.finish();
		debug!(classes = mapper.len(), lines = line_number, "Read mapping");
		Ok(mapper)
	}
}

impl MappingParser {
	fn parse_line(&mut self, line: &str, line_number: usize) -> Result<()> {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			if !self.seen_class {
				self.mapper.push_preamble_line(line.to_string());
			}
			return Ok(());
		}
		if let Some(comment) = trimmed.strip_prefix('#') {
			if !self.seen_class {
				self.mapper.push_preamble_line(line.to_string());
			}
			self.parse_comment(comment.trim());
			return Ok(());
		}
		if line.starts_with(char::is_whitespace) {
			return self.parse_member(trimmed, line_number);
		}
		self.parse_class(trimmed, line_number)
	}

	fn parse_comment(&mut self, comment: &str) {
		if !comment.starts_with('{') {
			return;
		}
		let value = match serde_json::from_str::<serde_json::Value>(comment) {
			Ok(value) => value,
			Err(error) => {
				debug!(%error, "Comment is not mapping information");
				return;
			}
		};
		match MappingInformation::from_json(value, self.version) {
			MappingInformation::MapVersion(mut info) => {
				if info.version == MapVersion::Experimental && !self.options.allow_experimental {
					info.version = MapVersion::None;
				}
				self.version = info.version;
				self.mapper.add_map_version(info);
			}
			MappingInformation::PartitionSourceFiles(files) => {
				for (original, file) in files {
					self.mapper.add_file_name(original, file);
				}
			}
			info => self.attach(info),
		}
	}

	fn attach(&mut self, info: MappingInformation) {
		let Some(class) = self.current.as_mut() else {
			return;
		};
		match &self.target {
			Target::Mapping => {}
			Target::Class => class.add_info(info),
			Target::Field(name) => {
				if let Some(field) = class.last_field_mut(name) {
					field.info.push(info);
				}
			}
			Target::MethodRange(name) => {
				if let Some(range) = class.last_mapped_range_mut(name) {
					range.info.push(info);
				}
			}
		}
	}

	fn parse_class(&mut self, line: &str, line_number: usize) -> Result<()> {
		let (original, renamed) = line
			.split_once("->")
			.ok_or_else(|| MappingError::parse(line_number, "expected `original -> renamed:`"))?;
		let renamed = renamed
			.trim()
			.strip_suffix(':')
			.ok_or_else(|| MappingError::parse(line_number, "class mapping must end with `:`"))?;
		let (original, renamed) = (original.trim(), renamed.trim());
		if original.is_empty() || renamed.is_empty() {
			return Err(MappingError::parse(line_number, "empty class name"));
		}
		self.finish_class();
		self.current = Some(ClassNaming::new(original, renamed));
		self.target = Target::Class;
		self.seen_class = true;
		Ok(())
	}

	fn parse_member(&mut self, line: &str, line_number: usize) -> Result<()> {
		let class = self
			.current
			.as_mut()
			.ok_or(MappingError::MemberOutsideClass { line: line_number })?;
		let (signature, renamed) = line
			.rsplit_once("->")
			.ok_or_else(|| MappingError::parse(line_number, "expected `signature -> renamed`"))?;
		let renamed = renamed.trim().to_string();
		if renamed.is_empty() {
			return Err(MappingError::parse(line_number, "empty renamed member name"));
		}
		let (minified_range, rest) = split_minified_range(signature.trim(), line_number)?;

		let Some(open) = rest.find('(') else {
			if minified_range.is_some() {
				return Err(MappingError::parse(line_number, "field mapping with a line range"));
			}
			let (field_type, name) = split_type_and_name(rest, line_number)?;
			class.add_field(FieldSignature::new(name, field_type), renamed.clone());
			self.target = Target::Field(renamed);
			return Ok(());
		};

		let close = rest[open..]
			.find(')')
			.map(|offset| open + offset)
			.ok_or_else(|| MappingError::parse(line_number, "unterminated parameter list"))?;
		let (return_type, name) = split_type_and_name(&rest[..open], line_number)?;
		let parameters = rest[open + 1..close]
			.split(',')
			.map(str::trim)
			.filter(|parameter| !parameter.is_empty())
			.map(str::to_string)
			.collect();
		let original_range = parse_original_range(&rest[close + 1..], line_number)?;

		class.add_mapped_range(MappedRange {
			minified_range,
			signature: MethodSignature::new(name, return_type, parameters),
			original_range,
			renamed_name: renamed.clone(),
			info: Vec::new(),
		});
		self.target = Target::MethodRange(renamed);
		Ok(())
	}

	fn finish_class(&mut self) {
		if let Some(mut class) = self.current.take() {
			class.finish();
			self.mapper.add_class(class);
		}
	}

	fn finish(mut self) -> ClassNameMapper {
		self.finish_class();
		self.mapper
	}
}

/// Splits a leading `from:to:` minified range off a method mapping.
fn split_minified_range(text: &str, line_number: usize) -> Result<(Option<Range>, &str)> {
	if !text.starts_with(|c: char| c.is_ascii_digit()) {
		return Ok((None, text));
	}
	let mut parts = text.splitn(3, ':');
	let from = parts.next().and_then(|part| part.parse::<i32>().ok());
	let to = parts.next().and_then(|part| part.parse::<i32>().ok());
	match (from, to, parts.next()) {
		(Some(from), Some(to), Some(rest)) if from <= to => Ok((Some(Range::new(from, to)), rest.trim())),
		_ => Err(MappingError::parse(line_number, "malformed minified line range")),
	}
}

/// Parses the `:from[:to]` suffix after a parameter list.
fn parse_original_range(text: &str, line_number: usize) -> Result<Option<Range>> {
	let text = text.trim();
	if text.is_empty() {
		return Ok(None);
	}
	let invalid = || MappingError::parse(line_number, "malformed original line range");
	let text = text.strip_prefix(':').ok_or_else(invalid)?;
	match text.split_once(':') {
		Some((from, to)) => {
			let from = from.trim().parse::<i32>().map_err(|_| invalid())?;
			let to = to.trim().parse::<i32>().map_err(|_| invalid())?;
			Ok(Some(Range::new(from, to)))
		}
		None => {
			let line = text.trim().parse::<i32>().map_err(|_| invalid())?;
			Ok(Some(Range::cardinal(line)))
		}
	}
}

fn split_type_and_name(text: &str, line_number: usize) -> Result<(&str, &str)> {
	text.trim()
		.split_once(' ')
		.map(|(type_name, name)| (type_name.trim(), name.trim()))
		.filter(|(type_name, name)| !type_name.is_empty() && !name.is_empty())
		.ok_or_else(|| MappingError::parse(line_number, "expected `type name`"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::naming::info::RewriteAction;

	const MAPPING: &str = "\
# compiler: R8
# {\"id\":\"com.android.tools.r8.mapping\",\"version\":\"2.0\"}
com.example.Foo -> a.a:
# {\"id\":\"sourceFile\",\"fileName\":\"Foo.kt\"}
    int count -> a
    1:3:void inlinee(int,java.lang.String):5:7 -> b
    1:3:void caller():42 -> b
    4:4:void caller():43:43 -> b
    void noLines() -> c
    5:5:void outline():0 -> d
    # {\"id\":\"com.android.tools.r8.outline\"}
com.example.Bar -> a.b:
    1:1:void com.example.Util.helper():10 -> a
    # {\"id\":\"com.android.tools.r8.rewriteFrame\",\"conditions\":[\"throws(Ljava/lang/NullPointerException;)\"],\"actions\":[\"removeInnerFrames(1)\"]}
";

	#[test]
	fn test_parse_classes_and_preamble() {
		let mapper = ClassNameMapper::parse_str(MAPPING).unwrap();
		assert_eq!(mapper.len(), 2);
		assert_eq!(mapper.map_version(), MapVersion::V2_0);
		assert_eq!(mapper.preamble().len(), 2);
		assert_eq!(mapper.source_file_for("com.example.Foo"), Some("Foo.kt"));
	}

	#[test]
	fn test_parse_mapped_ranges() {
		let mapper = ClassNameMapper::parse_str(MAPPING).unwrap();
		let foo = &mapper.class_namings("a.a")[0];
		let ranges = foo.mapped_ranges("b");
		assert_eq!(ranges.len(), 3);
		assert_eq!(ranges[0].minified_range, Some(Range::new(1, 3)));
		assert_eq!(ranges[0].signature.parameters, vec!["int", "java.lang.String"]);
		assert_eq!(ranges[0].original_range, Some(Range::new(5, 7)));
		assert_eq!(ranges[1].original_range, Some(Range::cardinal(42)));

		let no_lines = &foo.mapped_ranges("c")[0];
		assert_eq!(no_lines.minified_range, None);
		assert_eq!(no_lines.original_range, None);

		assert!(foo.mapped_ranges("d")[0].is_outline_frame());
		assert_eq!(foo.fields("a")[0].original.name(), "count");
	}

	#[test]
	fn test_members_come_from_outer_most_frames() {
		let mapper = ClassNameMapper::parse_str(MAPPING).unwrap();
		let foo = &mapper.class_namings("a.a")[0];
		let members: Vec<&str> = foo.methods("b").iter().map(|m| m.original.name()).collect();
		assert_eq!(members, vec!["caller"]);
	}

	#[test]
	fn test_rewrite_frame_attaches_to_range() {
		let mapper = ClassNameMapper::parse_str(MAPPING).unwrap();
		let bar = &mapper.class_namings("a.b")[0];
		let range = &bar.mapped_ranges("a")[0];
		let rewrite = range.rewrite_frames().next().unwrap();
		assert_eq!(rewrite.actions, vec![RewriteAction::RemoveInnerFrames(1)]);
		assert_eq!(range.signature.holder(), Some("com.example.Util"));
	}

	#[test]
	fn test_outline_ignored_without_version() {
		let mapper = ClassNameMapper::parse_str(
			"com.Foo -> a:\n    1:1:void o():1 -> a\n    # {\"id\":\"com.android.tools.r8.outline\"}\n",
		)
		.unwrap();
		assert!(!mapper.class_namings("a")[0].mapped_ranges("a")[0].is_outline_frame());
	}

	#[test]
	fn test_experimental_requires_opt_in() {
		let text = "# {\"id\":\"com.android.tools.r8.mapping\",\"version\":\"experimental\"}\n";
		let mapper = ClassNameMapper::parse_str(text).unwrap();
		assert_eq!(mapper.map_version(), MapVersion::None);

		let options = ParseOptions {
			allow_experimental: true,
			..ParseOptions::default()
		};
		let mapper = ClassNameMapper::parse_str_with(text, options).unwrap();
		assert_eq!(mapper.map_version(), MapVersion::Experimental);
	}

	#[test]
	fn test_partition_source_files_register_file_names() {
		let mapper = ClassNameMapper::parse_str(
			"# {\"id\":\"partitionSourceFiles\",\"fileNameMapping\":{\"com.Util\":\"Util.kt\"}}\ncom.Foo -> a:\n",
		)
		.unwrap();
		assert_eq!(mapper.source_file_for("com.Util"), Some("Util.kt"));
	}

	#[test]
	fn test_member_before_class_is_an_error() {
		let error = ClassNameMapper::parse_str("    int a -> b\n").unwrap_err();
		assert!(matches!(error, MappingError::MemberOutsideClass { line: 1 }));
	}

	#[test]
	fn test_malformed_lines_report_line_number() {
		let error = ClassNameMapper::parse_str("com.Foo -> a:\n    1:x:void m() -> a\n").unwrap_err();
		assert!(matches!(error, MappingError::Parse { line: 2, .. }));

		let error = ClassNameMapper::parse_str("com.Foo a\n").unwrap_err();
		assert!(matches!(error, MappingError::Parse { line: 1, .. }));
	}
}
