// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace line templates.
//!
//! A template is a regular expression with `%` directives standing for the
//! parts of a line that can be retraced:
//!
//! | Directive | Matches |
//! |---|---|
//! | `%c` | dotted class name |
//! | `%C` | slash delimited class name |
//! | `%m` | method name |
//! | `%f` | field name |
//! | `%s` | source file |
//! | `%l` | line number |
//! | `%t` | field or return type |
//! | `%a` | comma separated argument types |
//! | `%S` | source file and optional line number, `%s(?::%l)?` |
//!
//! A `%` preceded by a backslash is a literal.

use regex::{Captures, Regex};
use tracing::{debug, instrument};

use crate::error::{Result, RetraceError};
use crate::proxy::{ClassNameType, StackTraceElementStringProxy, StackTraceElementStringProxyBuilder};

/// Matches `at class.method(SourceFile:line)` frames and
/// `[Caused by: ]class[: message]` exception lines.
pub const DEFAULT_TEMPLATE: &str =
	r#"(?:.*?\bat\s+%c\.%m\s*\(%S\)\p{Z}*(?:~\[.*\])?)|(?:(?:(?:%c|.*)?[:"]\s+)?%c(?::.*)?)"#;

const JAVA_IDENTIFIER_SEGMENT: &str =
	r"[-$_\p{L}\p{Nl}\p{Sc}\p{Pc}][-$_\p{L}\p{Nl}\p{Sc}\p{Pc}\p{Nd}\p{Mn}\p{Mc}]*";

/// The marker of suppressed exceptions is never a class name.
const SUPPRESSED: &str = "Suppressed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
	TypeName,
	BinaryName,
	MethodName,
	FieldName,
	SourceFile,
	LineNumber,
	FieldOrReturnType,
	MethodArguments,
	SourceFileLineNumber,
}

impl Directive {
	fn from_char(directive: char) -> Option<Self> {
		Some(match directive {
			'c' => Self::TypeName,
			'C' => Self::BinaryName,
			'm' => Self::MethodName,
			'f' => Self::FieldName,
			's' => Self::SourceFile,
			'l' => Self::LineNumber,
			't' => Self::FieldOrReturnType,
			'a' => Self::MethodArguments,
			'S' => Self::SourceFileLineNumber,
			_ => return None,
		})
	}

	/// Synthetic directives expand to another template instead of a group.
	fn expansion(self) -> Option<&'static str> {
		match self {
			Self::SourceFileLineNumber => Some("%s(?::%l)?"),
			_ => None,
		}
	}

	fn pattern(self) -> String {
		let segment = JAVA_IDENTIFIER_SEGMENT;
		let java_type = format!(r"(?:{segment}\.)*{segment}[\[\]]*");
		match self {
			Self::TypeName => format!(r"(?:{segment}\.)*{segment}"),
			Self::BinaryName => format!(r"(?:{segment}/)*{segment}"),
			Self::MethodName => format!("(?:{segment}|<init>|<clinit>)"),
			Self::FieldName => segment.to_string(),
			Self::SourceFile => r"(?:(?::+[^\d:\s])|[^:]*)*".to_string(),
			Self::LineNumber => r"\d*".to_string(),
			Self::FieldOrReturnType => java_type,
			Self::MethodArguments => format!("(?:(?:{java_type},)*{java_type})?"),
			Self::SourceFileLineNumber => String::new(),
		}
	}

	fn is_class(self) -> bool {
		matches!(self, Self::TypeName | Self::BinaryName)
	}
}

#[derive(Debug, Clone)]
struct Handler {
	group: String,
	directive: Directive,
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct StackTraceLineParser {
	regex: Regex,
	handlers: Vec<Handler>,
}

impl StackTraceLineParser {
	/// Compiles `template`, or the default template when `None`.
	#[instrument(skip_all)]
	pub fn compile(template: Option<&str>) -> Result<Self> {
		let template = template.unwrap_or(DEFAULT_TEMPLATE);
		let mut handlers = Vec::new();
		let pattern = expand(template, 0, &mut handlers)?;
		let regex = Regex::new(&format!("^(?:{pattern})$"))?;
		debug!(groups = handlers.len(), "Compiled stack trace template");
		Ok(Self { regex, handlers })
	}

	/// Parses `line` into a proxy. A line the template does not match
	/// yields a proxy that renders it verbatim.
	pub fn parse(&self, line: &str) -> Result<StackTraceElementStringProxy> {
		let Some(captures) = self.regex.captures(line) else {
			return Ok(StackTraceElementStringProxy::unparsed(line));
		};
		let mut builder = StackTraceElementStringProxy::builder(line);
		let mut seen_class = false;
		for handler in &self.handlers {
			if handler.directive.is_class() && seen_class {
				continue;
			}
			if apply(handler, &captures, line, &mut builder)? && handler.directive.is_class() {
				seen_class = true;
			}
		}
		Ok(builder.build())
	}
}

/// Expands directives into named groups. `offset` positions error
/// messages within the outer template.
fn expand(template: &str, offset: usize, handlers: &mut Vec<Handler>) -> Result<String> {
	let mut pattern = String::with_capacity(template.len() * 4);
	let mut seen_percentage = false;
	let mut escaped = false;
	let mut last = 0;
	for (index, character) in template.char_indices() {
		if seen_percentage {
			let directive = Directive::from_char(character).ok_or_else(|| {
				RetraceError::invalid_template(offset + index, format!("unknown directive %{character}"))
			})?;
			pattern.push_str(&template[last..index - 1]);
			match directive.expansion() {
				Some(expansion) => pattern.push_str(&expand(expansion, offset + index, handlers)?),
				None => {
					let group = format!("captureGroup{}", handlers.len());
					pattern.push_str(&format!("(?P<{group}>{})", directive.pattern()));
					handlers.push(Handler { group, directive });
				}
			}
			last = index + character.len_utf8();
			seen_percentage = false;
			continue;
		}
		seen_percentage = !escaped && character == '%';
		escaped = !escaped && character == '\\';
	}
	if seen_percentage {
		return Err(RetraceError::invalid_template(
			offset + template.len() - 1,
			"template ends with a bare %",
		));
	}
	pattern.push_str(&template[last..]);
	Ok(pattern)
}

/// Registers the capture of `handler`. Returns whether anything was
/// registered. Empty captures are registered too, so an empty source file
/// still receives the retraced file name.
fn apply(
	handler: &Handler,
	captures: &Captures<'_>,
	line: &str,
	builder: &mut StackTraceElementStringProxyBuilder,
) -> Result<bool> {
	let Some(capture) = captures.name(&handler.group) else {
		return Ok(false);
	};
	let (start, end) = (capture.start(), capture.end());
	match handler.directive {
		Directive::TypeName | Directive::BinaryName => {
			if capture.as_str() == SUPPRESSED {
				return Ok(false);
			}
			let name_type = if handler.directive == Directive::BinaryName {
				ClassNameType::BinaryName
			} else {
				ClassNameType::TypeName
			};
			builder.register_class_name(start, end, name_type)?;
		}
		Directive::MethodName => builder.register_method_name(start, end)?,
		Directive::FieldName => builder.register_field_name(start, end)?,
		Directive::SourceFile => builder.register_source_file(start, end)?,
		Directive::LineNumber => {
			if start > 0 && line.as_bytes()[start - 1] == b':' {
				builder.register_line_number(start - 1, end, true)?;
			} else {
				builder.register_line_number(start, end, false)?;
			}
		}
		Directive::FieldOrReturnType => builder.register_field_or_return_type(start, end)?,
		Directive::MethodArguments => builder.register_method_arguments(start, end)?,
		Directive::SourceFileLineNumber => return Ok(false),
	}
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn default_parser() -> StackTraceLineParser {
		StackTraceLineParser::compile(None).unwrap()
	}

	#[test]
	fn test_frame_line() {
		let proxy = default_parser().parse("  at com.foo.Bar.baz(Bar.java:42)").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "com.foo.Bar");
		assert_eq!(proxy.method_name(), Some("baz"));
		assert_eq!(proxy.source_file(), Some("Bar.java"));
		assert_eq!(proxy.line_number(), Some(42));
	}

	#[test]
	fn test_exception_line() {
		let proxy = default_parser().parse("com.foo.MyException: boom").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "com.foo.MyException");
		assert_eq!(proxy.method_name(), None);
		assert_eq!(proxy.line_number(), None);
	}

	#[test]
	fn test_caused_by_line() {
		let proxy = default_parser().parse("Caused by: a.b: something failed").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "a.b");
	}

	#[test]
	fn test_suppressed_marker_is_not_a_class() {
		let proxy = default_parser().parse("Suppressed: ...").unwrap();
		assert!(!proxy.has_class_name());

		let proxy = default_parser().parse("Suppressed: a.b: inner").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "a.b");
	}

	#[test]
	fn test_frame_without_line_number() {
		let proxy = default_parser().parse("\tat a.a.b(Unknown Source)").unwrap();
		assert_eq!(proxy.source_file(), Some("Unknown Source"));
		assert_eq!(proxy.line_number(), None);
	}

	#[test]
	fn test_constructor_frame() {
		let proxy = default_parser().parse("at a.a.<init>(SourceFile:7)").unwrap();
		assert_eq!(proxy.method_name(), Some("<init>"));
	}

	#[test]
	fn test_custom_template_with_binary_names_and_types() {
		let parser = StackTraceLineParser::compile(Some(r"%C %t %f \(%a\)")).unwrap();
		let proxy = parser.parse("a/b/c int[] d (a.e,long)").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "a.b.c");
		assert_eq!(proxy.field_or_return_type(), Some("int[]"));
		assert_eq!(proxy.field_name(), Some("d"));
		assert_eq!(proxy.method_arguments(), Some("a.e,long"));
	}

	#[test]
	fn test_escaped_percent_is_literal() {
		let parser = StackTraceLineParser::compile(Some(r"\%c %c")).unwrap();
		let proxy = parser.parse("%c a.b").unwrap();
		assert_eq!(proxy.class_name().unwrap().type_name(), "a.b");
	}

	#[test]
	fn test_unknown_directive_is_rejected() {
		let error = StackTraceLineParser::compile(Some("at %x")).unwrap_err();
		assert!(matches!(error, RetraceError::InvalidTemplate { offset: 4, .. }));
	}

	#[test]
	fn test_empty_source_file_is_registered() {
		let proxy = default_parser().parse("\tat a.b(:12)").unwrap();
		assert_eq!(proxy.source_file(), Some(""));
		assert_eq!(proxy.line_number(), Some(12));
	}

	#[test]
	fn test_unmatched_line_is_verbatim() {
		let proxy = default_parser().parse("   ... 12 more").unwrap();
		assert!(!proxy.has_class_name());
		assert_eq!(proxy.line(), "   ... 12 more");
	}

	proptest! {
		#[test]
		fn frame_lines_round_trip_their_fields(
			class in "[a-z]{1,3}(\\.[a-z]{1,3}){0,3}",
			method in "[a-z]{1,4}",
			line in 1i32..100_000,
		) {
			let text = format!("\tat {class}.{method}(SourceFile:{line})");
			let proxy = default_parser().parse(&text).unwrap();
			let class_name = proxy.class_name().unwrap();
			prop_assert_eq!(class_name.type_name(), class.as_str());
			prop_assert_eq!(proxy.method_name(), Some(method.as_str()));
			prop_assert_eq!(proxy.line_number(), Some(line));
		}
	}
}
