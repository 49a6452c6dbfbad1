// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retracing of one parsed stack trace line into its candidate
//! interpretations.

use std::cmp::Ordering;

use loom_retrace_core::TypeReference;
use tracing::trace;

use crate::proxy::StackTraceElementStringProxy;
use crate::retracer::{
	RetraceClassResult, RetraceStackTraceContext, RetracedClassReference, RetracedFieldReference,
	RetracedMethodReference, RetracedSourceFile, RetracedTypeReference, Retracer,
};

/// One candidate interpretation of a stack trace line.
///
/// Fields left `None` were either absent from the line or could not be
/// retraced, and render as the obfuscated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetracedElement {
	retraced_class: Option<RetracedClassReference>,
	retraced_method: Option<RetracedMethodReference>,
	retraced_field: Option<RetracedFieldReference>,
	field_or_return_type: Option<RetracedTypeReference>,
	method_arguments: Option<Vec<RetracedTypeReference>>,
	source_file: Option<String>,
	line_number: Option<i32>,
	is_ambiguous: bool,
	is_top_frame: bool,
	context: RetraceStackTraceContext,
}

impl RetracedElement {
	pub fn with_class(mut self, class: RetracedClassReference) -> Self {
		self.retraced_class = Some(class);
		self
	}

	/// Sets the method and its holder as the retraced class.
	pub fn with_method(mut self, method: RetracedMethodReference) -> Self {
		self.retraced_class = Some(method.holder_class());
		self.retraced_method = Some(method);
		self
	}

	pub fn with_field(mut self, field: RetracedFieldReference) -> Self {
		self.retraced_field = Some(field);
		self
	}

	pub fn with_field_or_return_type(mut self, field_or_return_type: RetracedTypeReference) -> Self {
		self.field_or_return_type = Some(field_or_return_type);
		self
	}

	pub fn with_method_arguments(mut self, arguments: Vec<RetracedTypeReference>) -> Self {
		self.method_arguments = Some(arguments);
		self
	}

	pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
		self.source_file = Some(source_file.into());
		self
	}

	pub fn with_line_number(mut self, line_number: i32) -> Self {
		self.line_number = Some(line_number);
		self
	}

	/// Ambiguity accumulates: once set it is never cleared.
	pub fn join_ambiguous(mut self, ambiguous: bool) -> Self {
		self.is_ambiguous |= ambiguous;
		self
	}

	pub fn with_top_frame(mut self, top_frame: bool) -> Self {
		self.is_top_frame = top_frame;
		self
	}

	pub fn with_context(mut self, context: RetraceStackTraceContext) -> Self {
		self.context = context;
		self
	}

	pub fn retraced_class(&self) -> Option<&RetracedClassReference> {
		self.retraced_class.as_ref()
	}

	pub fn retraced_method(&self) -> Option<&RetracedMethodReference> {
		self.retraced_method.as_ref()
	}

	pub fn retraced_field(&self) -> Option<&RetracedFieldReference> {
		self.retraced_field.as_ref()
	}

	pub fn field_or_return_type(&self) -> Option<&RetracedTypeReference> {
		self.field_or_return_type.as_ref()
	}

	pub fn method_arguments(&self) -> Option<&[RetracedTypeReference]> {
		self.method_arguments.as_deref()
	}

	pub fn source_file(&self) -> Option<&str> {
		self.source_file.as_deref()
	}

	pub fn line_number(&self) -> Option<i32> {
		self.line_number
	}

	pub fn is_ambiguous(&self) -> bool {
		self.is_ambiguous
	}

	pub fn is_top_frame(&self) -> bool {
		self.is_top_frame
	}

	pub fn context(&self) -> &RetraceStackTraceContext {
		&self.context
	}

	/// Orders by class, method, source file and line number, absent values
	/// first.
	pub fn compare(&self, other: &Self) -> Ordering {
		self.retraced_class
			.as_ref()
			.map(RetracedClassReference::type_name)
			.cmp(&other.retraced_class.as_ref().map(RetracedClassReference::type_name))
			.then_with(|| match (&self.retraced_method, &other.retraced_method) {
				(Some(one), Some(other)) => one.compare(other),
				(one, other) => one.is_some().cmp(&other.is_some()),
			})
			.then_with(|| self.source_file.cmp(&other.source_file))
			.then_with(|| self.line_number.cmp(&other.line_number))
	}

	/// Whether two interpretations of the same line render identically
	/// for a reader. Signatures are only compared in `verbose` mode; line
	/// numbers only when verbose or when the obfuscated line had a
	/// positive one.
	pub(crate) fn equivalent(&self, other: &Self, verbose: bool, obfuscated_line: Option<i32>) -> bool {
		let class_name = |element: &Self| element.retraced_class.as_ref().map(|class| class.type_name().to_string());
		if class_name(self) != class_name(other) || self.source_file != other.source_file {
			return false;
		}
		if (verbose || obfuscated_line.is_some_and(|line| line > 0)) && self.line_number != other.line_number {
			return false;
		}
		match (&self.retraced_method, &other.retraced_method) {
			(None, None) => {}
			(Some(one), Some(other)) => {
				if one.is_known() != other.is_known() || one.method_name() != other.method_name() {
					return false;
				}
				if verbose && one.method_reference() != other.method_reference() {
					return false;
				}
			}
			_ => return false,
		}
		match (&self.retraced_field, &other.retraced_field) {
			(None, None) => {}
			(Some(one), Some(other)) => {
				if one.is_known() != other.is_known() || one.field_name() != other.field_name() {
					return false;
				}
				if verbose && one.field_type() != other.field_type() {
					return false;
				}
			}
			_ => return false,
		}
		match (&self.field_or_return_type, &other.field_or_return_type) {
			(None, None) => {}
			(Some(one), Some(other)) if one.same_type(other) => {}
			_ => return false,
		}
		match (&self.method_arguments, &other.method_arguments) {
			(None, None) => true,
			(Some(one), Some(other)) => {
				one.len() == other.len() && one.iter().zip(other).all(|(one, other)| one.same_type(other))
			}
			_ => false,
		}
	}
}

/// Candidates for one line together with the context the next line starts
/// from when no candidate supplies one.
#[derive(Debug, Clone)]
pub struct RetracedElements {
	pub elements: Vec<RetracedElement>,
	pub context: RetraceStackTraceContext,
}

/// Fans a parsed line out into every combination of retraced types,
/// arguments, frames, fields and exceptions.
#[derive(Debug, Clone)]
pub struct StackTraceElementProxyRetracer<'a> {
	retracer: &'a Retracer,
}

impl<'a> StackTraceElementProxyRetracer<'a> {
	pub fn new(retracer: &'a Retracer) -> Self {
		Self { retracer }
	}

	pub fn retrace(&self, proxy: &StackTraceElementStringProxy, context: &RetraceStackTraceContext) -> RetracedElements {
		let mut retraced = RetracedElements {
			elements: vec![RetracedElement::default().with_context(context.clone())],
			context: RetraceStackTraceContext::empty(),
		};
		let class_name = proxy.class_name();
		if class_name.is_none() && proxy.field_or_return_type().is_none() && proxy.method_arguments().is_none() {
			return retraced;
		}
		retraced.elements = self.retrace_field_or_return_type(retraced.elements, proxy);
		retraced.elements = self.retrace_method_arguments(retraced.elements, proxy);
		let Some(class_name) = class_name else {
			return retraced;
		};
		let class_result = self.retracer.retrace_class(&class_name);
		if let Some(method_name) = proxy.method_name() {
			let (elements, result_context) =
				self.retrace_method(retraced.elements, proxy, &class_result, method_name, context);
			retraced.elements = elements;
			retraced.context = result_context;
		} else if let Some(field_name) = proxy.field_name() {
			retraced.elements = self.retrace_field(retraced.elements, proxy, &class_result, field_name);
		} else {
			retraced.elements = self.retrace_thrown_exception(retraced.elements, proxy, &class_result);
		}
		trace!(line = proxy.line(), candidates = retraced.elements.len(), "Retraced line");
		retraced
	}

	fn retrace_field_or_return_type(
		&self,
		elements: Vec<RetracedElement>,
		proxy: &StackTraceElementStringProxy,
	) -> Vec<RetracedElement> {
		let Some(type_name) = proxy.field_or_return_type() else {
			return elements;
		};
		if type_name == "void" {
			return elements
				.into_iter()
				.map(|element| element.with_field_or_return_type(RetracedTypeReference::Void))
				.collect();
		}
		let result = self.retracer.retrace_type(&TypeReference::from_type_name(type_name));
		let ambiguous = result.is_ambiguous();
		elements
			.into_iter()
			.flat_map(|element| {
				result.elements().iter().map(move |retraced| {
					element
						.clone()
						.with_field_or_return_type(retraced.clone())
						.join_ambiguous(ambiguous)
				})
			})
			.collect()
	}

	fn retrace_method_arguments(
		&self,
		elements: Vec<RetracedElement>,
		proxy: &StackTraceElementStringProxy,
	) -> Vec<RetracedElement> {
		let Some(arguments) = proxy.method_arguments() else {
			return elements;
		};
		let mut combinations: Vec<Vec<RetracedTypeReference>> = vec![Vec::new()];
		for argument in arguments.split(',').filter(|argument| !argument.is_empty()) {
			let result = self.retracer.retrace_type(&TypeReference::from_type_name(argument));
			combinations = result
				.elements()
				.iter()
				.flat_map(|retraced| {
					combinations.iter().map(move |prefix| {
						let mut combination = prefix.clone();
						combination.push(retraced.clone());
						combination
					})
				})
				.collect();
		}
		let ambiguous = combinations.len() > 1;
		elements
			.into_iter()
			.flat_map(|element| {
				combinations.iter().map(move |combination| {
					element
						.clone()
						.with_method_arguments(combination.clone())
						.join_ambiguous(ambiguous)
				})
			})
			.collect()
	}

	fn retrace_method(
		&self,
		elements: Vec<RetracedElement>,
		proxy: &StackTraceElementStringProxy,
		class_result: &RetraceClassResult,
		method_name: &str,
		context: &RetraceStackTraceContext,
	) -> (Vec<RetracedElement>, RetraceStackTraceContext) {
		let line_number = proxy.line_number();
		let mut result_context = RetraceStackTraceContext::empty();
		let mut retraced = Vec::new();
		for element in elements {
			let frame_result = class_result.lookup_frame(context, line_number, method_name);
			if frame_result.is_empty() {
				for class_element in class_result.elements() {
					let mut unknown = element
						.clone()
						.with_top_frame(true)
						.join_ambiguous(class_result.is_ambiguous())
						.with_class(class_element.retraced_class().clone());
					if let Some(line_number) = line_number {
						unknown = unknown.with_line_number(line_number);
					}
					retraced.push(with_source_file(unknown, proxy, || class_element.source_file()));
				}
				continue;
			}
			for frame_element in frame_result.elements() {
				let frame_context = frame_element.context();
				result_context = frame_context.clone();
				for frame in frame_element.rewritten_frames() {
					let method = frame.method().clone();
					let mut candidate = element
						.clone()
						.with_method(method.clone())
						.join_ambiguous(frame_result.is_ambiguous())
						.with_top_frame(frame.index() == 0)
						.with_context(frame_context.clone());
					if let Some(line_number) = line_number {
						candidate = candidate.with_line_number(method.original_position_or_default(line_number));
					}
					retraced.push(with_source_file(candidate, proxy, || frame_element.source_file(&method)));
				}
			}
		}
		(retraced, result_context)
	}

	fn retrace_field(
		&self,
		elements: Vec<RetracedElement>,
		proxy: &StackTraceElementStringProxy,
		class_result: &RetraceClassResult,
		field_name: &str,
	) -> Vec<RetracedElement> {
		let field_result = class_result.lookup_field(field_name);
		let field_elements = field_result.elements();
		let mut retraced = Vec::new();
		for element in elements {
			for field_element in &field_elements {
				let field = field_element.field().clone();
				let candidate = element
					.clone()
					.with_class(field.holder_class())
					.with_field(field)
					.join_ambiguous(field_result.is_ambiguous())
					.with_top_frame(true);
				retraced.push(with_source_file(candidate, proxy, || {
					field_element.class_element().source_file()
				}));
			}
		}
		retraced
	}

	/// A class without a method or field is taken to be a thrown exception.
	fn retrace_thrown_exception(
		&self,
		elements: Vec<RetracedElement>,
		proxy: &StackTraceElementStringProxy,
		class_result: &RetraceClassResult,
	) -> Vec<RetracedElement> {
		let mut retraced = Vec::new();
		for element in elements {
			for exception in class_result.lookup_thrown_exception(element.context()) {
				let candidate = element
					.clone()
					.with_class(exception.retraced_class().clone())
					.join_ambiguous(class_result.is_ambiguous())
					.with_top_frame(true)
					.with_context(exception.context().clone());
				retraced.push(with_source_file(candidate, proxy, || exception.source_file()));
			}
		}
		retraced
	}
}

/// Only lines that carried a source file get one back.
fn with_source_file(
	element: RetracedElement,
	proxy: &StackTraceElementStringProxy,
	source_file: impl FnOnce() -> RetracedSourceFile,
) -> RetracedElement {
	match proxy.source_file() {
		Some(obfuscated) => {
			let file_name = source_file().or_infer(obfuscated);
			element.with_source_file(file_name)
		}
		None => element,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::template::StackTraceLineParser;
	use loom_retrace_core::{ClassNameMapper, ClassReference};

	const MAPPING: &str = "\
com.example.Foo -> a.a:
    10:10:void bar() -> b
    11:11:void baz() -> b
    int count -> c
com.example.Bar -> a.b:
com.example.Baz -> a.c:
";

	fn retrace(line: &str) -> RetracedElements {
		let retracer = Retracer::from_mapper(ClassNameMapper::parse_str(MAPPING).unwrap());
		let parser = StackTraceLineParser::compile(None).unwrap();
		let proxy = parser.parse(line).unwrap();
		StackTraceElementProxyRetracer::new(&retracer).retrace(&proxy, &RetraceStackTraceContext::empty())
	}

	fn method_names(retraced: &RetracedElements) -> Vec<&str> {
		retraced
			.elements
			.iter()
			.filter_map(|element| element.retraced_method().map(RetracedMethodReference::method_name))
			.collect()
	}

	#[test]
	fn test_unparsed_line_passes_context_through() {
		let retracer = Retracer::from_mapper(ClassNameMapper::default());
		let context = RetraceStackTraceContext::empty().with_rewrite_position(3);
		let retraced = StackTraceElementProxyRetracer::new(&retracer)
			.retrace(&StackTraceElementStringProxy::unparsed("random text"), &context);
		assert_eq!(retraced.elements.len(), 1);
		assert_eq!(retraced.elements[0].context(), &context);
		assert!(retraced.elements[0].retraced_class().is_none());
	}

	#[test]
	fn test_frame_with_position() {
		let retraced = retrace("\tat a.a.b(SourceFile:11)");
		assert_eq!(method_names(&retraced), vec!["baz"]);
		let element = &retraced.elements[0];
		assert_eq!(element.line_number(), Some(11));
		assert_eq!(element.source_file(), Some("Foo.java"));
		assert!(element.is_top_frame());
		assert!(!element.is_ambiguous());
	}

	#[test]
	fn test_empty_source_file_is_inferred() {
		let line = "\tat a.a.b(:10)";
		let retraced = retrace(line);
		let element = &retraced.elements[0];
		assert_eq!(element.source_file(), Some("Foo.java"));
		let proxy = StackTraceLineParser::compile(None).unwrap().parse(line).unwrap();
		assert_eq!(proxy.render(element, false), "\tat com.example.Foo.bar(Foo.java:10)");
	}

	#[test]
	fn test_frame_without_position_is_ambiguous() {
		let retraced = retrace("\tat a.a.b(Unknown Source)");
		assert_eq!(method_names(&retraced), vec!["bar", "baz"]);
		assert!(retraced.elements.iter().all(RetracedElement::is_ambiguous));
		assert_eq!(retraced.elements[0].source_file(), Some("Unknown Source"));
	}

	#[test]
	fn test_unknown_method_keeps_line() {
		let retraced = retrace("\tat a.b.zz(SourceFile:4)");
		assert_eq!(retraced.elements.len(), 1);
		let element = &retraced.elements[0];
		assert_eq!(element.retraced_class().map(RetracedClassReference::type_name), Some("com.example.Bar"));
		assert!(element.retraced_method().is_none());
		assert_eq!(element.line_number(), Some(4));
	}

	#[test]
	fn test_exception_line_sets_thrown_exception() {
		let retraced = retrace("a.c: boom");
		let element = &retraced.elements[0];
		assert_eq!(element.retraced_class().map(RetracedClassReference::type_name), Some("com.example.Baz"));
		assert_eq!(
			element.context().thrown_exception().map(ClassReference::type_name),
			Some("a.c")
		);
	}

	#[test]
	fn test_argument_combinations() {
		let retracer = Retracer::from_mapper(ClassNameMapper::parse_str(MAPPING).unwrap());
		let parser = StackTraceLineParser::compile(Some(r"%c\.%m\(%a\)")).unwrap();
		let proxy = parser.parse("a.a.b(a.b,int,a.c)").unwrap();
		let retraced = StackTraceElementProxyRetracer::new(&retracer).retrace(&proxy, &RetraceStackTraceContext::empty());
		let arguments: Vec<&str> = retraced.elements[0]
			.method_arguments()
			.unwrap()
			.iter()
			.map(RetracedTypeReference::type_name)
			.collect();
		assert_eq!(arguments, vec!["com.example.Bar", "int", "com.example.Baz"]);
	}

	#[test]
	fn test_equivalence_ignores_line_without_obfuscated_position() {
		let class = RetracedClassReference::Known(ClassReference::from_type_name("com.Foo"));
		let one = RetracedElement::default().with_class(class.clone()).with_line_number(3);
		let other = RetracedElement::default().with_class(class).with_line_number(4);
		assert!(one.equivalent(&other, false, None));
		assert!(!one.equivalent(&other, false, Some(7)));
		assert!(!one.equivalent(&other, true, None));
	}

	#[test]
	fn test_equivalence_compares_argument_types() {
		let int = RetracedTypeReference::Type(TypeReference::from_type_name("int"));
		let long = RetracedTypeReference::Type(TypeReference::from_type_name("long"));
		let one = RetracedElement::default().with_method_arguments(vec![int.clone()]);
		assert!(one.equivalent(&one.clone(), false, None));
		assert!(!one.equivalent(&RetracedElement::default().with_method_arguments(vec![long]), false, None));
	}

	#[test]
	fn test_ordering_puts_absent_fields_first() {
		let bare = RetracedElement::default();
		let class = RetracedElement::default()
			.with_class(RetracedClassReference::Known(ClassReference::from_type_name("com.Foo")));
		assert_eq!(bare.compare(&class), Ordering::Less);
		assert_eq!(
			class.clone().with_line_number(2).compare(&class.with_line_number(10)),
			Ordering::Less
		);
	}
}
