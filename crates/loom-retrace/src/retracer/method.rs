// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use indexmap::IndexMap;
use loom_retrace_core::{ClassReference, MappedRange, MemberNaming, MethodSignature};

use super::class::{RetraceClassElement, RetraceClassResult};
use super::context::RetraceStackTraceContext;
use super::frame::RetraceFrameResult;
use super::retraced::{MethodDefinition, RetracedClassReference, RetracedMethodReference};
use super::Retracer;

/// The mapped ranges of one renamed method name that share an outer-most
/// original signature.
#[derive(Debug, Clone)]
pub(crate) struct MethodPartition {
	pub(crate) member: Option<MemberNaming>,
	pub(crate) signature: MethodSignature,
	pub(crate) ranges: Vec<MappedRange>,
}

/// Candidates contributed by one class element. `None` means the mapping
/// has nothing for the method under that class.
#[derive(Debug, Clone)]
pub(crate) struct MethodCandidates {
	pub(crate) class: RetraceClassElement,
	pub(crate) partitions: Option<Vec<MethodPartition>>,
}

/// Splits `ranges` into consecutive groups sharing a minified range.
///
/// Ranges without a minified range are never grouped with a neighbour.
pub(crate) fn minified_range_groups(ranges: &[MappedRange]) -> Vec<Vec<MappedRange>> {
	let mut groups: Vec<Vec<MappedRange>> = Vec::new();
	for range in ranges {
		match groups.last_mut() {
			Some(group)
				if range.minified_range.is_some() && group[0].minified_range == range.minified_range =>
			{
				group.push(range.clone());
			}
			_ => groups.push(vec![range.clone()]),
		}
	}
	groups
}

fn partition_by_outer_signature(ranges: &[MappedRange]) -> IndexMap<MethodSignature, Vec<MappedRange>> {
	let mut partitions: IndexMap<MethodSignature, Vec<MappedRange>> = IndexMap::new();
	for group in minified_range_groups(ranges) {
		let Some(outer) = group.last() else {
			continue;
		};
		partitions
			.entry(outer.signature.clone())
			.or_default()
			.extend(group);
	}
	partitions
}

/// Result of looking up a method by name or signature.
#[derive(Debug, Clone)]
pub struct RetraceMethodResult {
	definition: MethodDefinition,
	candidates: Vec<MethodCandidates>,
}

impl RetraceMethodResult {
	pub(crate) fn new(class_result: &RetraceClassResult, definition: MethodDefinition) -> Self {
		let candidates = class_result
			.elements()
			.into_iter()
			.map(|class| {
				let partitions = class.naming().and_then(|naming| {
					let holder = ClassReference::from_type_name(naming.original_name());
					let partitions: Vec<MethodPartition> =
						partition_by_outer_signature(naming.mapped_ranges(definition.name()))
							.into_iter()
							.filter(|(signature, _)| matches_definition(class.retracer(), &definition, signature, &holder))
							.map(|(signature, ranges)| MethodPartition {
								member: naming.method_member(definition.name(), &signature).cloned(),
								signature,
								ranges,
							})
							.collect();
					(!partitions.is_empty()).then_some(partitions)
				});
				MethodCandidates { class, partitions }
			})
			.collect();
		Self { definition, candidates }
	}

	pub fn is_empty(&self) -> bool {
		self.candidates
			.first()
			.map_or(true, |candidates| candidates.partitions.is_none())
	}

	pub fn is_ambiguous(&self) -> bool {
		if self.candidates.len() > 1 {
			return true;
		}
		self.candidates
			.first()
			.and_then(|candidates| candidates.partitions.as_ref())
			.is_some_and(|partitions| partitions.len() > 1)
	}

	pub fn elements(&self) -> Vec<RetraceMethodElement> {
		let mut elements = Vec::new();
		for candidates in &self.candidates {
			let retraced_class = candidates.class.retraced_class();
			match &candidates.partitions {
				None => elements.push(RetraceMethodElement {
					class: candidates.class.clone(),
					method: unknown_method(retraced_class, &self.definition),
				}),
				Some(partitions) => {
					for partition in partitions {
						elements.push(RetraceMethodElement {
							class: candidates.class.clone(),
							method: RetracedMethodReference::Known {
								method: partition
									.signature
									.to_method_reference(retraced_class.class_reference()),
								position: None,
							},
						});
					}
				}
			}
		}
		elements
	}

	/// Narrows the candidates to the frames at an obfuscated position.
	pub fn narrow_by_position(&self, context: &RetraceStackTraceContext, position: Option<i32>) -> RetraceFrameResult {
		RetraceFrameResult::new(self.definition.clone(), &self.candidates, context, position)
	}
}

pub(crate) fn unknown_method(class: &RetracedClassReference, definition: &MethodDefinition) -> RetracedMethodReference {
	RetracedMethodReference::Unknown {
		holder: class.clone(),
		definition: definition.substitute_holder(class.class_reference().clone()),
		position: None,
	}
}

/// A full definition only keeps originals whose signature its obfuscated
/// types retrace to.
fn matches_definition(
	retracer: &Retracer,
	definition: &MethodDefinition,
	signature: &MethodSignature,
	holder: &ClassReference,
) -> bool {
	let MethodDefinition::Full(method) = definition else {
		return true;
	};
	let original = signature.to_method_reference(holder);
	if method.formal_types().len() != original.formal_types().len() {
		return false;
	}
	let arguments_match = method
		.formal_types()
		.iter()
		.zip(original.formal_types())
		.all(|(obfuscated, original)| retracer.type_matches(obfuscated, original.type_name()));
	let return_matches = match (method.return_type(), original.return_type()) {
		(None, None) => true,
		(Some(obfuscated), Some(original)) => retracer.type_matches(obfuscated, original.type_name()),
		_ => false,
	};
	arguments_match && return_matches
}

/// One candidate original method.
#[derive(Debug, Clone)]
pub struct RetraceMethodElement {
	class: RetraceClassElement,
	method: RetracedMethodReference,
}

impl RetraceMethodElement {
	pub fn class_element(&self) -> &RetraceClassElement {
		&self.class
	}

	pub fn method(&self) -> &RetracedMethodReference {
		&self.method
	}

	pub fn is_unknown(&self) -> bool {
		self.method.is_unknown()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_retrace_core::{ClassNameMapper, Range};

	fn range(minified: Option<(i32, i32)>, name: &str) -> MappedRange {
		MappedRange {
			minified_range: minified.map(|(from, to)| Range::new(from, to)),
			signature: MethodSignature::new(name, "void", vec![]),
			original_range: None,
			renamed_name: "a".into(),
			info: vec![],
		}
	}

	#[test]
	fn test_groups_follow_minified_ranges() {
		let ranges = vec![
			range(Some((1, 2)), "inner"),
			range(Some((1, 2)), "outer"),
			range(Some((3, 3)), "other"),
			range(None, "x"),
			range(None, "y"),
		];
		let sizes: Vec<usize> = minified_range_groups(&ranges).iter().map(Vec::len).collect();
		assert_eq!(sizes, vec![2, 1, 1, 1]);
	}

	#[test]
	fn test_partitions_keyed_by_outer_most_signature() {
		let ranges = vec![
			range(Some((1, 2)), "inner"),
			range(Some((1, 2)), "outer"),
			range(Some((3, 3)), "outer"),
			range(Some((4, 4)), "other"),
		];
		let partitions = partition_by_outer_signature(&ranges);
		let names: Vec<&str> = partitions.keys().map(|s| s.name.as_str()).collect();
		assert_eq!(names, vec!["outer", "other"]);
		assert_eq!(partitions[0].len(), 3);
	}

	#[test]
	fn test_overloads_make_method_lookup_ambiguous() {
		let mapper = ClassNameMapper::parse_str(
			"com.Foo -> a:\n    1:1:void run():10 -> a\n    2:2:void run(int):20 -> a\n",
		)
		.unwrap();
		let result = Retracer::from_mapper(mapper)
			.retrace_class(&ClassReference::from_type_name("a"))
			.lookup_method("a");
		assert!(result.is_ambiguous());
		let descriptions: Vec<String> = result
			.elements()
			.iter()
			.map(|e| e.method().verbose_description())
			.collect();
		assert_eq!(descriptions, vec!["void run()", "void run(int)"]);
	}

	#[test]
	fn test_missing_method_is_unknown_with_retraced_holder() {
		let mapper = ClassNameMapper::parse_str("com.Foo -> a:\n").unwrap();
		let result = Retracer::from_mapper(mapper)
			.retrace_class(&ClassReference::from_type_name("a"))
			.lookup_method("zz");
		assert!(result.is_empty());
		let elements = result.elements();
		assert_eq!(elements.len(), 1);
		assert!(elements[0].is_unknown());
		assert_eq!(elements[0].method().holder_class().type_name(), "com.Foo");
		assert_eq!(elements[0].method().method_name(), "zz");
	}
}
