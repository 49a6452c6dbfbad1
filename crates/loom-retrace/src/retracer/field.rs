// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_retrace_core::{FieldSignature, TypeReference};

use super::class::{RetraceClassElement, RetraceClassResult};
use super::retraced::RetracedFieldReference;

#[derive(Debug, Clone)]
struct FieldCandidates {
	class: RetraceClassElement,
	fields: Vec<FieldSignature>,
}

/// Result of looking up a field by name, optionally constrained by type.
#[derive(Debug, Clone)]
pub struct RetraceFieldResult {
	name: String,
	candidates: Vec<FieldCandidates>,
}

impl RetraceFieldResult {
	pub(crate) fn new(class_result: &RetraceClassResult, name: &str, field_type: Option<&TypeReference>) -> Self {
		let candidates = class_result
			.elements()
			.into_iter()
			.map(|class| {
				let fields = class
					.naming()
					.map(|naming| {
						naming
							.fields(name)
							.iter()
							.filter_map(|member| member.original.as_field())
							.filter(|field| {
								field_type.map_or(true, |obfuscated| {
									class.retracer().type_matches(obfuscated, &field.field_type)
								})
							})
							.cloned()
							.collect()
					})
					.unwrap_or_default();
				FieldCandidates { class, fields }
			})
			.collect();
		Self {
			name: name.to_string(),
			candidates,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.candidates
			.first()
			.map_or(true, |candidates| candidates.fields.is_empty())
	}

	pub fn is_ambiguous(&self) -> bool {
		match self.candidates.as_slice() {
			[single] => single.fields.len() > 1,
			candidates => candidates.len() > 1,
		}
	}

	pub fn elements(&self) -> Vec<RetraceFieldElement> {
		let mut elements = Vec::new();
		for candidates in &self.candidates {
			let retraced_class = candidates.class.retraced_class();
			if candidates.fields.is_empty() {
				elements.push(RetraceFieldElement {
					class: candidates.class.clone(),
					field: RetracedFieldReference::Unknown {
						holder: retraced_class.clone(),
						name: self.name.clone(),
					},
				});
				continue;
			}
			for field in &candidates.fields {
				elements.push(RetraceFieldElement {
					class: candidates.class.clone(),
					field: RetracedFieldReference::Known(field.to_field_reference(retraced_class.class_reference())),
				});
			}
		}
		elements
	}
}

/// One candidate original field.
#[derive(Debug, Clone)]
pub struct RetraceFieldElement {
	class: RetraceClassElement,
	field: RetracedFieldReference,
}

impl RetraceFieldElement {
	pub fn class_element(&self) -> &RetraceClassElement {
		&self.class
	}

	pub fn field(&self) -> &RetracedFieldReference {
		&self.field
	}

	pub fn is_unknown(&self) -> bool {
		self.field.is_unknown()
	}
}
