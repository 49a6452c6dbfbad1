// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use loom_retrace_core::{ClassNaming, ClassReference, TypeReference};

use super::context::RetraceStackTraceContext;
use super::field::RetraceFieldResult;
use super::frame::RetraceFrameResult;
use super::method::RetraceMethodResult;
use super::retraced::{MethodDefinition, RetracedClassReference, RetracedSourceFile};
use super::types::RetraceThrownExceptionElement;
use super::Retracer;

/// All class namings registered under one obfuscated class name.
#[derive(Debug, Clone)]
pub struct RetraceClassResult {
	obfuscated: ClassReference,
	namings: Vec<Arc<ClassNaming>>,
	retracer: Retracer,
}

impl RetraceClassResult {
	pub(crate) fn new(obfuscated: ClassReference, namings: Vec<Arc<ClassNaming>>, retracer: Retracer) -> Self {
		Self {
			obfuscated,
			namings,
			retracer,
		}
	}

	pub fn obfuscated_class(&self) -> &ClassReference {
		&self.obfuscated
	}

	/// True when the mapping has nothing for this class.
	pub fn is_empty(&self) -> bool {
		self.namings.is_empty()
	}

	pub fn is_ambiguous(&self) -> bool {
		self.namings.len() > 1
	}

	/// One element per naming, or a single unknown element.
	pub fn elements(&self) -> Vec<RetraceClassElement> {
		if self.namings.is_empty() {
			return vec![RetraceClassElement {
				retraced: RetracedClassReference::Unknown(self.obfuscated.clone()),
				naming: None,
				retracer: self.retracer.clone(),
			}];
		}
		self.namings
			.iter()
			.map(|naming| RetraceClassElement {
				retraced: RetracedClassReference::Known(ClassReference::from_type_name(naming.original_name())),
				naming: Some(Arc::clone(naming)),
				retracer: self.retracer.clone(),
			})
			.collect()
	}

	pub fn lookup_method(&self, name: &str) -> RetraceMethodResult {
		self.lookup_method_definition(MethodDefinition::base(self.obfuscated.clone(), name))
	}

	pub(crate) fn lookup_method_definition(&self, definition: MethodDefinition) -> RetraceMethodResult {
		RetraceMethodResult::new(self, definition)
	}

	pub fn lookup_field(&self, name: &str) -> RetraceFieldResult {
		RetraceFieldResult::new(self, name, None)
	}

	pub fn lookup_field_with_type(&self, name: &str, field_type: &TypeReference) -> RetraceFieldResult {
		RetraceFieldResult::new(self, name, Some(field_type))
	}

	/// Looks up a frame of the method `name` at an optional obfuscated position.
	pub fn lookup_frame(
		&self,
		context: &RetraceStackTraceContext,
		position: Option<i32>,
		name: &str,
	) -> RetraceFrameResult {
		self.lookup_frame_definition(context, position, MethodDefinition::base(self.obfuscated.clone(), name))
	}

	pub(crate) fn lookup_frame_definition(
		&self,
		context: &RetraceStackTraceContext,
		position: Option<i32>,
		definition: MethodDefinition,
	) -> RetraceFrameResult {
		self.lookup_method_definition(definition)
			.narrow_by_position(context, position)
	}

	/// Treats this class as the exception thrown by the following frames.
	pub fn lookup_thrown_exception(&self, context: &RetraceStackTraceContext) -> Vec<RetraceThrownExceptionElement> {
		let context = context.with_thrown_exception(self.obfuscated.clone());
		self.elements()
			.into_iter()
			.map(|element| RetraceThrownExceptionElement::new(element, context.clone()))
			.collect()
	}
}

/// One candidate original class for an obfuscated class.
#[derive(Debug, Clone)]
pub struct RetraceClassElement {
	retraced: RetracedClassReference,
	naming: Option<Arc<ClassNaming>>,
	retracer: Retracer,
}

impl RetraceClassElement {
	pub fn retraced_class(&self) -> &RetracedClassReference {
		&self.retraced
	}

	pub fn naming(&self) -> Option<&ClassNaming> {
		self.naming.as_deref()
	}

	pub fn is_unknown(&self) -> bool {
		self.retraced.is_unknown()
	}

	pub fn source_file(&self) -> RetracedSourceFile {
		self.retracer.source_file(&self.retraced)
	}

	pub(crate) fn retracer(&self) -> &Retracer {
		&self.retracer
	}
}
