// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! A parsed stack trace line that remembers where each recognised field
//! sits, so that retraced values can be written back in place.

use loom_retrace_core::{ClassReference, TypeReference};

use crate::element::RetracedElement;
use crate::error::{Result, RetraceError};
use crate::supplier::MappingSupplier;

/// How a class name is written in the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassNameType {
	/// Dotted: `com.example.Foo`.
	TypeName,
	/// Slash delimited: `com/example/Foo`.
	BinaryName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
	ClassName(ClassNameType),
	MethodName,
	SourceFile,
	LineNumber { insert_separator: bool },
	FieldName,
	FieldOrReturnType,
	MethodArguments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StringIndex {
	start: usize,
	end: usize,
	kind: FieldKind,
}

/// An immutable parse of one stack trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceElementStringProxy {
	line: String,
	indices: Vec<StringIndex>,
}

impl StackTraceElementStringProxy {
	pub fn builder(line: impl Into<String>) -> StackTraceElementStringProxyBuilder {
		StackTraceElementStringProxyBuilder {
			line: line.into(),
			indices: Vec::new(),
		}
	}

	/// A proxy that recognised nothing and renders the line verbatim.
	pub fn unparsed(line: impl Into<String>) -> Self {
		Self {
			line: line.into(),
			indices: Vec::new(),
		}
	}

	pub fn line(&self) -> &str {
		&self.line
	}

	fn find(&self, predicate: impl Fn(FieldKind) -> bool) -> Option<&StringIndex> {
		self.indices.iter().find(|index| predicate(index.kind))
	}

	fn text(&self, predicate: impl Fn(FieldKind) -> bool) -> Option<&str> {
		self.find(predicate).map(|index| &self.line[index.start..index.end])
	}

	pub fn has_class_name(&self) -> bool {
		self.class_name().is_some()
	}

	pub fn class_name(&self) -> Option<ClassReference> {
		let index = self.find(|kind| matches!(kind, FieldKind::ClassName(_)))?;
		let text = &self.line[index.start..index.end];
		Some(match index.kind {
			FieldKind::ClassName(ClassNameType::BinaryName) => ClassReference::from_binary_name(text),
			_ => ClassReference::from_type_name(text),
		})
	}

	pub fn method_name(&self) -> Option<&str> {
		self.text(|kind| kind == FieldKind::MethodName)
	}

	pub fn source_file(&self) -> Option<&str> {
		self.text(|kind| kind == FieldKind::SourceFile)
	}

	/// The line number, when one was recognised and parses.
	pub fn line_number(&self) -> Option<i32> {
		let index = self.find(|kind| matches!(kind, FieldKind::LineNumber { .. }))?;
		let text = &self.line[index.start..index.end];
		text.trim_start_matches(':').parse().ok()
	}

	pub fn field_name(&self) -> Option<&str> {
		self.text(|kind| kind == FieldKind::FieldName)
	}

	pub fn field_or_return_type(&self) -> Option<&str> {
		self.text(|kind| kind == FieldKind::FieldOrReturnType)
	}

	pub fn method_arguments(&self) -> Option<&str> {
		self.text(|kind| kind == FieldKind::MethodArguments)
	}

	/// Tells `supplier` about every obfuscated class the line mentions.
	pub fn register_uses<S: MappingSupplier + ?Sized>(&self, supplier: &mut S) {
		if let Some(class) = self.class_name() {
			supplier.register_class_use(&class);
		}
		if let Some(arguments) = self.method_arguments() {
			for argument in arguments.split(',') {
				supplier.register_type_use(&TypeReference::from_type_name(argument));
			}
		}
		if let Some(field_or_return_type) = self.field_or_return_type().filter(|name| *name != "void") {
			supplier.register_type_use(&TypeReference::from_type_name(field_or_return_type));
		}
	}

	/// Writes `element` back into the line, copying everything between the
	/// recognised fields verbatim.
	pub fn render(&self, element: &RetracedElement, verbose: bool) -> String {
		let mut rendered = String::with_capacity(self.line.len());
		let mut last = 0;
		for index in &self.indices {
			rendered.push_str(&self.line[last..index.start]);
			let original = &self.line[index.start..index.end];
			match self.replacement(index.kind, element, verbose) {
				Some(replacement) => rendered.push_str(&replacement),
				None => rendered.push_str(original),
			}
			last = index.end;
		}
		rendered.push_str(&self.line[last..]);
		rendered
	}

	fn replacement(&self, kind: FieldKind, element: &RetracedElement, verbose: bool) -> Option<String> {
		match kind {
			FieldKind::ClassName(name_type) => element.retraced_class().map(|class| match name_type {
				ClassNameType::TypeName => class.type_name().to_string(),
				ClassNameType::BinaryName => class.binary_name(),
			}),
			FieldKind::MethodName => element.retraced_method().map(|method| {
				if verbose {
					method.verbose_description()
				} else {
					method.method_name().to_string()
				}
			}),
			FieldKind::SourceFile => element.source_file().map(str::to_string),
			FieldKind::LineNumber { insert_separator } => element.line_number().map(|line| {
				if line <= 0 {
					String::new()
				} else if insert_separator {
					format!(":{line}")
				} else {
					line.to_string()
				}
			}),
			FieldKind::FieldName => element.retraced_field().map(|field| {
				if verbose {
					field.verbose_description()
				} else {
					field.field_name().to_string()
				}
			}),
			FieldKind::FieldOrReturnType => element
				.field_or_return_type()
				.map(|retraced| retraced.type_name().to_string()),
			FieldKind::MethodArguments => element.method_arguments().map(|arguments| {
				arguments
					.iter()
					.map(|argument| argument.type_name())
					.collect::<Vec<_>>()
					.join(",")
			}),
		}
	}
}

/// Registers field ranges in strictly increasing start order.
#[derive(Debug, Clone)]
pub struct StackTraceElementStringProxyBuilder {
	line: String,
	indices: Vec<StringIndex>,
}

impl StackTraceElementStringProxyBuilder {
	fn register(&mut self, start: usize, end: usize, kind: FieldKind) -> Result<()> {
		if let Some(previous) = self.indices.last() {
			// An empty range may be followed by one at the same offset.
			if start < previous.start || (start == previous.start && previous.end > previous.start) {
				return Err(RetraceError::OutOfOrderRange {
					previous: previous.start,
					start,
				});
			}
		}
		if start > end || !self.line.is_char_boundary(start) || !self.line.is_char_boundary(end) {
			return Err(RetraceError::InvalidRange { start, end });
		}
		self.indices.push(StringIndex { start, end, kind });
		Ok(())
	}

	pub fn register_class_name(&mut self, start: usize, end: usize, name_type: ClassNameType) -> Result<()> {
		self.register(start, end, FieldKind::ClassName(name_type))
	}

	pub fn register_method_name(&mut self, start: usize, end: usize) -> Result<()> {
		self.register(start, end, FieldKind::MethodName)
	}

	pub fn register_source_file(&mut self, start: usize, end: usize) -> Result<()> {
		self.register(start, end, FieldKind::SourceFile)
	}

	/// `insert_separator` marks a range that includes a leading `:`.
	pub fn register_line_number(&mut self, start: usize, end: usize, insert_separator: bool) -> Result<()> {
		self.register(start, end, FieldKind::LineNumber { insert_separator })
	}

	pub fn register_field_name(&mut self, start: usize, end: usize) -> Result<()> {
		self.register(start, end, FieldKind::FieldName)
	}

	pub fn register_field_or_return_type(&mut self, start: usize, end: usize) -> Result<()> {
		self.register(start, end, FieldKind::FieldOrReturnType)
	}

	pub fn register_method_arguments(&mut self, start: usize, end: usize) -> Result<()> {
		self.register(start, end, FieldKind::MethodArguments)
	}

	pub fn has_class_name(&self) -> bool {
		self.indices
			.iter()
			.any(|index| matches!(index.kind, FieldKind::ClassName(_)))
	}

	pub fn build(self) -> StackTraceElementStringProxy {
		StackTraceElementStringProxy {
			line: self.line,
			indices: self.indices,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::retracer::{RetracedClassReference, RetracedMethodReference};
	use loom_retrace_core::MethodReference;

	const LINE: &str = "  at a.b.c(SourceFile:3)";

	fn proxy() -> StackTraceElementStringProxy {
		let mut builder = StackTraceElementStringProxy::builder(LINE);
		builder.register_class_name(5, 8, ClassNameType::TypeName).unwrap();
		builder.register_method_name(9, 10).unwrap();
		builder.register_source_file(11, 21).unwrap();
		builder.register_line_number(21, 23, true).unwrap();
		builder.build()
	}

	#[test]
	fn test_accessors_read_registered_ranges() {
		let proxy = proxy();
		assert_eq!(proxy.class_name().map(|c| c.type_name().to_string()), Some("a.b".into()));
		assert_eq!(proxy.method_name(), Some("c"));
		assert_eq!(proxy.source_file(), Some("SourceFile"));
		assert_eq!(proxy.line_number(), Some(3));
		assert_eq!(proxy.field_name(), None);
	}

	#[test]
	fn test_out_of_order_registration_is_rejected() {
		let mut builder = StackTraceElementStringProxy::builder(LINE);
		builder.register_method_name(9, 10).unwrap();
		let error = builder.register_class_name(5, 8, ClassNameType::TypeName).unwrap_err();
		assert!(matches!(error, RetraceError::OutOfOrderRange { previous: 9, start: 5 }));
		assert!(builder.register_source_file(9, 10).is_err());
	}

	#[test]
	fn test_empty_range_shares_its_offset() {
		let mut builder = StackTraceElementStringProxy::builder("x(:3)");
		builder.register_source_file(2, 2).unwrap();
		builder.register_line_number(2, 4, true).unwrap();
		assert!(builder.register_method_name(2, 2).is_err());
		let proxy = builder.build();
		assert_eq!(proxy.source_file(), Some(""));
		assert_eq!(proxy.line_number(), Some(3));
	}

	#[test]
	fn test_unretraced_fields_render_verbatim() {
		assert_eq!(proxy().render(&RetracedElement::default(), false), LINE);
	}

	#[test]
	fn test_render_replaces_fields_in_place() {
		let method = RetracedMethodReference::Known {
			method: MethodReference::new(ClassReference::from_type_name("com.Foo"), "bar", vec![], None),
			position: Some(42),
		};
		let element = RetracedElement::default()
			.with_class(RetracedClassReference::Known(ClassReference::from_type_name("com.Foo")))
			.with_method(method)
			.with_source_file("Foo.java")
			.with_line_number(42);
		assert_eq!(proxy().render(&element, false), "  at com.Foo.bar(Foo.java:42)");
		assert_eq!(proxy().render(&element, true), "  at com.Foo.void bar()(Foo.java:42)");
	}

	#[test]
	fn test_non_positive_line_drops_separator() {
		let element = RetracedElement::default().with_line_number(0);
		assert_eq!(proxy().render(&element, false), "  at a.b.c(SourceFile)");
	}
}
