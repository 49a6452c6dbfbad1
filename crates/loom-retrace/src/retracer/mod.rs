// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The resolution engine: maps obfuscated references back to their
//! original candidates.

mod class;
mod context;
mod field;
mod frame;
mod method;
mod retraced;
mod types;

use std::sync::Arc;

use loom_retrace_core::{
	ClassNameMapper, ClassReference, DiagnosticsHandler, FieldReference, MethodReference, TracingDiagnostics,
	TypeReference,
};
use tracing::trace;

pub use class::{RetraceClassElement, RetraceClassResult};
pub use context::RetraceStackTraceContext;
pub use field::{RetraceFieldElement, RetraceFieldResult};
pub use frame::{RetraceFrameElement, RetraceFrameResult, RetracedSingleFrame};
pub use method::{RetraceMethodElement, RetraceMethodResult};
pub use retraced::{
	MethodDefinition, RetracedClassReference, RetracedFieldReference, RetracedMethodReference, RetracedSourceFile,
	RetracedTypeReference,
};
pub use types::{RetraceThrownExceptionElement, RetraceTypeResult};

/// Answers retrace queries against a loaded mapping.
///
/// Cloning is cheap; results keep a clone to resolve source files and to
/// report diagnostics.
#[derive(Clone)]
pub struct Retracer {
	mapper: Arc<ClassNameMapper>,
	diagnostics: Arc<dyn DiagnosticsHandler>,
}

impl std::fmt::Debug for Retracer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Retracer")
			.field("classes", &self.mapper.len())
			.finish_non_exhaustive()
	}
}

impl Retracer {
	pub fn new(mapper: Arc<ClassNameMapper>, diagnostics: Arc<dyn DiagnosticsHandler>) -> Self {
		Self { mapper, diagnostics }
	}

	/// A retracer that reports diagnostics through `tracing`.
	pub fn from_mapper(mapper: ClassNameMapper) -> Self {
		Self::new(Arc::new(mapper), Arc::new(TracingDiagnostics))
	}

	pub fn mapper(&self) -> &ClassNameMapper {
		&self.mapper
	}

	pub fn diagnostics(&self) -> &dyn DiagnosticsHandler {
		self.diagnostics.as_ref()
	}

	pub fn retrace_class(&self, class: &ClassReference) -> RetraceClassResult {
		let namings = self.mapper.class_namings(class.type_name());
		trace!(class = %class, candidates = namings.len(), "Retracing class");
		RetraceClassResult::new(class.clone(), namings, self.clone())
	}

	/// Retraces a method by its full obfuscated signature.
	pub fn retrace_method(&self, method: &MethodReference) -> RetraceMethodResult {
		self.retrace_class(method.holder())
			.lookup_method_definition(MethodDefinition::Full(method.clone()))
	}

	/// Retraces a frame of `method` at an optional obfuscated `position`.
	pub fn retrace_frame(
		&self,
		context: &RetraceStackTraceContext,
		position: Option<i32>,
		method: &MethodReference,
	) -> RetraceFrameResult {
		self.retrace_class(method.holder())
			.lookup_frame_definition(context, position, MethodDefinition::Full(method.clone()))
	}

	pub fn retrace_field(&self, field: &FieldReference) -> RetraceFieldResult {
		self.retrace_class(field.holder())
			.lookup_field_with_type(field.name(), field.field_type())
	}

	pub fn retrace_type(&self, type_reference: &TypeReference) -> RetraceTypeResult {
		RetraceTypeResult::new(self, type_reference)
	}

	pub fn retrace_thrown_exception(
		&self,
		class: &ClassReference,
		context: &RetraceStackTraceContext,
	) -> Vec<RetraceThrownExceptionElement> {
		self.retrace_class(class).lookup_thrown_exception(context)
	}

	/// Source file for a retraced class, from the mapping when present.
	pub fn source_file(&self, class: &RetracedClassReference) -> RetracedSourceFile {
		let file_name = class
			.is_known()
			.then(|| self.mapper.source_file_for(class.type_name()))
			.flatten()
			.map(str::to_string);
		RetracedSourceFile::new(file_name, class.clone())
	}

	/// Whether the obfuscated `candidate` type can retrace to `original`.
	pub(crate) fn type_matches(&self, candidate: &TypeReference, original: &str) -> bool {
		self.retrace_type(candidate)
			.elements()
			.iter()
			.any(|retraced| retraced.type_name() == original)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MAPPING: &str = "\
com.example.Foo -> a.a:
# {\"id\":\"sourceFile\",\"fileName\":\"Foo.kt\"}
    int count -> a
    10:10:void bar() -> b
    11:11:void baz(com.example.Foo):20 -> b
";

	fn retracer() -> Retracer {
		Retracer::from_mapper(ClassNameMapper::parse_str(MAPPING).unwrap())
	}

	#[test]
	fn test_single_frame_end_to_end() {
		let retracer = retracer();
		let method = MethodReference::new(ClassReference::from_type_name("a.a"), "b", vec![], None);
		let result = retracer.retrace_frame(&RetraceStackTraceContext::empty(), Some(10), &method);
		let elements = result.elements();
		assert_eq!(elements.len(), 1);
		assert!(!result.is_ambiguous());
		let top = elements[0].top_frame();
		assert_eq!(top.holder_class().type_name(), "com.example.Foo");
		assert_eq!(top.method_name(), "bar");
	}

	#[test]
	fn test_full_method_definition_filters_by_arguments() {
		let retracer = retracer();
		let method = MethodReference::new(
			ClassReference::from_type_name("a.a"),
			"b",
			vec![TypeReference::from_type_name("a.a")],
			None,
		);
		let result = retracer.retrace_method(&method);
		let elements = result.elements();
		let names: Vec<&str> = elements.iter().map(|e| e.method().method_name()).collect();
		assert_eq!(names, vec!["baz"]);
	}

	#[test]
	fn test_field_by_type() {
		let retracer = retracer();
		let field = FieldReference::new(
			ClassReference::from_type_name("a.a"),
			"a",
			TypeReference::from_type_name("int"),
		);
		let result = retracer.retrace_field(&field);
		assert_eq!(result.elements().len(), 1);
		assert_eq!(result.elements()[0].field().field_name(), "count");
	}

	#[test]
	fn test_source_file_only_for_known_classes() {
		let retracer = retracer();
		let known = RetracedClassReference::Known(ClassReference::from_type_name("com.example.Foo"));
		assert_eq!(retracer.source_file(&known).file_name(), Some("Foo.kt"));
		let unknown = RetracedClassReference::Unknown(ClassReference::from_type_name("com.example.Foo"));
		assert_eq!(retracer.source_file(&unknown).file_name(), None);
	}
}
