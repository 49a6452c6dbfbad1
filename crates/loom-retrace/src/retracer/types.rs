// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_retrace_core::TypeReference;

use super::class::RetraceClassElement;
use super::context::RetraceStackTraceContext;
use super::retraced::{RetracedClassReference, RetracedSourceFile, RetracedTypeReference};
use super::Retracer;

/// Every original type an obfuscated type can stand for.
///
/// Primitives and `void` retrace to themselves; arrays keep their
/// dimensions around the retraced element class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetraceTypeResult {
	elements: Vec<RetracedTypeReference>,
}

impl RetraceTypeResult {
	pub(crate) fn new(retracer: &Retracer, obfuscated: &TypeReference) -> Self {
		if obfuscated.type_name() == "void" {
			return Self {
				elements: vec![RetracedTypeReference::Void],
			};
		}
		let Some(base) = obfuscated.base_class() else {
			return Self {
				elements: vec![RetracedTypeReference::Type(obfuscated.clone())],
			};
		};
		let elements = retracer
			.retrace_class(&base)
			.elements()
			.iter()
			.map(|element| RetracedTypeReference::Type(obfuscated.with_base(element.retraced_class().type_name())))
			.collect();
		Self { elements }
	}

	pub fn elements(&self) -> &[RetracedTypeReference] {
		&self.elements
	}

	pub fn is_ambiguous(&self) -> bool {
		self.elements.len() > 1
	}
}

/// A retraced exception class together with the context it sets up for
/// the frames that follow.
#[derive(Debug, Clone)]
pub struct RetraceThrownExceptionElement {
	class: RetraceClassElement,
	context: RetraceStackTraceContext,
}

impl RetraceThrownExceptionElement {
	pub(crate) fn new(class: RetraceClassElement, context: RetraceStackTraceContext) -> Self {
		Self { class, context }
	}

	pub fn retraced_class(&self) -> &RetracedClassReference {
		self.class.retraced_class()
	}

	pub fn source_file(&self) -> RetracedSourceFile {
		self.class.source_file()
	}

	pub fn context(&self) -> &RetraceStackTraceContext {
		&self.context
	}
}
