// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Frame lookup: the method candidates of a name narrowed to the mapped
//! ranges covering one obfuscated position.

use loom_retrace_core::{ClassReference, MappedRange, MemberNaming};
use tracing::trace;

use super::class::RetraceClassElement;
use super::context::RetraceStackTraceContext;
use super::method::{minified_range_groups, unknown_method, MethodCandidates, MethodPartition};
use super::retraced::{MethodDefinition, RetracedMethodReference, RetracedSourceFile};

/// Ranges of one partition that cover the queried position.
#[derive(Debug, Clone)]
struct NarrowedPartition {
	member: Option<MemberNaming>,
	groups: Vec<Vec<MappedRange>>,
	position: Option<i32>,
}

#[derive(Debug, Clone)]
struct FrameCandidates {
	class: RetraceClassElement,
	partitions: Option<Vec<NarrowedPartition>>,
	position: Option<i32>,
}

impl FrameCandidates {
	fn is_ambiguous(&self) -> bool {
		let Some(partitions) = &self.partitions else {
			return false;
		};
		match partitions.as_slice() {
			[] => false,
			[single] => {
				single.groups.len() > 1
					|| (single.position.is_some()
						&& single
							.groups
							.first()
							.and_then(|group| group.first())
							.is_some_and(is_mapped_range_ambiguous))
			}
			_ => true,
		}
	}
}

/// A range maps ambiguously when several original lines stand behind it
/// and the minified range cannot tell them apart.
fn is_mapped_range_ambiguous(range: &MappedRange) -> bool {
	let Some(original) = range.original_range else {
		return false;
	};
	if original.span() == 1 {
		return false;
	}
	range
		.minified_range
		.map_or(true, |minified| minified.span() != original.span())
}

/// Keeps the ranges whose minified range contains `position`, falling back
/// to ranges without a minified range. `None` when neither exists.
fn narrow(ranges: &[MappedRange], position: Option<i32>) -> Option<Vec<MappedRange>> {
	let Some(position) = position else {
		return Some(ranges.to_vec());
	};
	let containing: Vec<MappedRange> = ranges
		.iter()
		.filter(|range| range.minified_range.is_some_and(|minified| minified.contains(position)))
		.cloned()
		.collect();
	if !containing.is_empty() {
		return Some(containing);
	}
	let unpositioned: Vec<MappedRange> = ranges
		.iter()
		.filter(|range| range.minified_range.is_none())
		.cloned()
		.collect();
	(!unpositioned.is_empty()).then_some(unpositioned)
}

/// Narrows one partition, following an outline callsite when the context
/// carries the position inside a preceding outline frame.
fn narrow_partition(
	partition: &MethodPartition,
	context: &RetraceStackTraceContext,
	position: Option<i32>,
) -> Option<NarrowedPartition> {
	let mut ranges = narrow(&partition.ranges, position)?;
	let mut position = position;
	if let Some(rewrite_position) = context.rewrite_position() {
		let rewritten = ranges
			.last()
			.and_then(MappedRange::outline_callsite)
			.and_then(|callsite| callsite.rewrite_position(rewrite_position));
		if let Some(rewritten) = rewritten {
			trace!(from = rewrite_position, to = rewritten, "Following outline callsite");
			if let Some(callsite_ranges) = narrow(&partition.ranges, Some(rewritten)) {
				ranges = callsite_ranges;
				position = Some(rewritten);
			}
		}
	}
	Some(NarrowedPartition {
		member: partition.member.clone(),
		groups: minified_range_groups(&ranges),
		position,
	})
}

/// Narrows every partition of a class. When the position falls outside all
/// of them, every partition is kept whole.
fn narrow_partitions(
	partitions: &[MethodPartition],
	context: &RetraceStackTraceContext,
	position: Option<i32>,
) -> Vec<NarrowedPartition> {
	let narrowed: Vec<NarrowedPartition> = partitions
		.iter()
		.filter_map(|partition| narrow_partition(partition, context, position))
		.collect();
	if !narrowed.is_empty() {
		return narrowed;
	}
	partitions
		.iter()
		.map(|partition| NarrowedPartition {
			member: partition.member.clone(),
			groups: minified_range_groups(&partition.ranges),
			position,
		})
		.collect()
}

/// Position reported for a range when nothing narrower is known.
fn default_frame_position(range: &MappedRange) -> Option<i32> {
	range
		.original_range
		.filter(|original| original.span() == 1)
		.map(|original| original.from)
}

fn retraced_method(
	holder: &ClassReference,
	range: &MappedRange,
	frame_position: Option<i32>,
	obfuscated_position: Option<i32>,
	ambiguous: bool,
) -> RetracedMethodReference {
	let method = range.signature.to_method_reference(holder);
	let position = if !ambiguous && (range.minified_range.is_none() || obfuscated_position.is_none()) {
		frame_position.or_else(|| {
			let first = range.first_position_of_original_range(0);
			(first > 0).then_some(first)
		})
	} else {
		match (range.minified_range, obfuscated_position) {
			(Some(minified), Some(obfuscated)) if minified.contains(obfuscated) => {
				frame_position.or(Some(range.original_line_number(obfuscated)))
			}
			_ => frame_position,
		}
	};
	RetracedMethodReference::Known { method, position }
}

/// Result of looking up a frame: every candidate logical frame.
#[derive(Debug, Clone)]
pub struct RetraceFrameResult {
	definition: MethodDefinition,
	candidates: Vec<FrameCandidates>,
	context: RetraceStackTraceContext,
}

impl RetraceFrameResult {
	pub(crate) fn new(
		definition: MethodDefinition,
		candidates: &[MethodCandidates],
		context: &RetraceStackTraceContext,
		position: Option<i32>,
	) -> Self {
		let candidates = candidates
			.iter()
			.map(|candidates| FrameCandidates {
				class: candidates.class.clone(),
				partitions: candidates
					.partitions
					.as_ref()
					.map(|partitions| narrow_partitions(partitions, context, position)),
				position,
			})
			.collect();
		Self {
			definition,
			candidates,
			context: context.without_rewrite_position(),
		}
	}

	pub fn is_ambiguous(&self) -> bool {
		match self.candidates.as_slice() {
			[single] => single.is_ambiguous(),
			candidates => candidates.len() > 1,
		}
	}

	/// True when the mapping has no ranges for the method.
	pub fn is_empty(&self) -> bool {
		self.candidates
			.first()
			.and_then(|candidates| candidates.partitions.as_ref())
			.map_or(true, Vec::is_empty)
	}

	/// The context the frames were looked up with.
	pub fn context(&self) -> &RetraceStackTraceContext {
		&self.context
	}

	pub fn elements(&self) -> Vec<RetraceFrameElement> {
		let ambiguous = self.is_ambiguous();
		let mut elements = Vec::new();
		for candidates in &self.candidates {
			let Some(partitions) = candidates.partitions.as_ref().filter(|p| !p.is_empty()) else {
				elements.push(self.unknown_element(candidates));
				continue;
			};
			for partition in partitions {
				for group in &partition.groups {
					self.separate_ambiguous_positions(candidates, partition, group, ambiguous, &mut elements);
				}
			}
		}
		elements
	}

	fn unknown_element(&self, candidates: &FrameCandidates) -> RetraceFrameElement {
		RetraceFrameElement {
			class: candidates.class.clone(),
			top: unknown_method(candidates.class.retraced_class(), &self.definition),
			frames: Vec::new(),
			member: None,
			obfuscated_position: candidates.position,
			ambiguous: false,
			context: self.context.clone(),
		}
	}

	/// Emits one element per original line when a single group maps a
	/// position to several original lines.
	fn separate_ambiguous_positions(
		&self,
		candidates: &FrameCandidates,
		partition: &NarrowedPartition,
		group: &[MappedRange],
		ambiguous: bool,
		elements: &mut Vec<RetraceFrameElement>,
	) {
		let Some(first) = group.first() else {
			return;
		};
		let defaults: Vec<FrameRange> = group
			.iter()
			.map(|range| FrameRange {
				range: range.clone(),
				position: default_frame_position(range),
			})
			.collect();
		let spread = first
			.original_range
			.filter(|_| ambiguous && is_mapped_range_ambiguous(first));
		match spread {
			None => elements.push(self.element(candidates, partition, defaults, ambiguous)),
			Some(original) => {
				for line in original.from..=original.to {
					let mut frames = defaults.clone();
					frames[0].position = Some(line);
					elements.push(self.element(candidates, partition, frames, ambiguous));
				}
			}
		}
	}

	fn element(
		&self,
		candidates: &FrameCandidates,
		partition: &NarrowedPartition,
		frames: Vec<FrameRange>,
		ambiguous: bool,
	) -> RetraceFrameElement {
		let holder = candidates.class.retraced_class().class_reference();
		let top = retraced_method(holder, &frames[0].range, frames[0].position, partition.position, ambiguous);
		RetraceFrameElement {
			class: candidates.class.clone(),
			top,
			frames,
			member: partition.member.clone(),
			obfuscated_position: partition.position,
			ambiguous,
			context: self.context.clone(),
		}
	}
}

#[derive(Debug, Clone)]
struct FrameRange {
	range: MappedRange,
	position: Option<i32>,
}

/// One retraced frame of an element, numbered in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetracedSingleFrame {
	method: RetracedMethodReference,
	index: usize,
}

impl RetracedSingleFrame {
	pub fn method(&self) -> &RetracedMethodReference {
		&self.method
	}

	pub fn index(&self) -> usize {
		self.index
	}
}

/// One logical frame: the top (inner-most) method and the methods it was
/// inlined into.
#[derive(Debug, Clone)]
pub struct RetraceFrameElement {
	class: RetraceClassElement,
	top: RetracedMethodReference,
	frames: Vec<FrameRange>,
	member: Option<MemberNaming>,
	obfuscated_position: Option<i32>,
	ambiguous: bool,
	context: RetraceStackTraceContext,
}

impl RetraceFrameElement {
	pub fn class_element(&self) -> &RetraceClassElement {
		&self.class
	}

	pub fn top_frame(&self) -> &RetracedMethodReference {
		&self.top
	}

	pub fn is_unknown(&self) -> bool {
		self.top.is_unknown()
	}

	/// Callers the top frame was inlined into, inner-most first.
	pub fn outer_frames(&self) -> Vec<RetracedMethodReference> {
		let holder = self.class.retraced_class().class_reference();
		self.frames
			.iter()
			.skip(1)
			.map(|frame| {
				retraced_method(
					holder,
					&frame.range,
					frame.position,
					self.obfuscated_position,
					self.ambiguous,
				)
			})
			.collect()
	}

	/// The top frame followed by every outer frame.
	pub fn frames(&self) -> Vec<RetracedSingleFrame> {
		std::iter::once(self.top.clone())
			.chain(self.outer_frames())
			.enumerate()
			.map(|(index, method)| RetracedSingleFrame { method, index })
			.collect()
	}

	/// Frames after applying rewrite rules for the thrown exception and
	/// dropping a compiler synthesized outer-most frame.
	pub fn rewritten_frames(&self) -> Vec<RetracedSingleFrame> {
		let ranges: Vec<MappedRange> = self.frames.iter().map(|frame| frame.range.clone()).collect();
		let total = ranges.len().max(1) as i64;
		let mut remove = self.context.inner_frames_to_remove(&ranges) as i64;
		if remove > total {
			let message = format!(
				"Cannot remove {remove} inner frames from the retraced output of {} because it exceeds the number of retraced frames",
				self.top.verbose_description()
			);
			self.class.retracer().diagnostics().warning(&message);
			remove = 0;
		}

		let mut rewritten = Vec::new();
		let mut previous = self.top.clone();
		for next in self.outer_frames() {
			if remove <= 0 {
				rewritten.push(RetracedSingleFrame {
					method: previous,
					index: rewritten.len(),
				});
			}
			remove -= 1;
			previous = next;
		}
		if remove <= 0 && !self.is_outer_most_compiler_synthesized() {
			rewritten.push(RetracedSingleFrame {
				method: previous,
				index: rewritten.len(),
			});
		}
		rewritten
	}

	fn is_outer_most_compiler_synthesized(&self) -> bool {
		if let Some(member) = &self.member {
			return member.is_compiler_synthesized();
		}
		self.frames
			.last()
			.is_some_and(|frame| frame.range.is_compiler_synthesized())
	}

	/// True only for a single frame that the compiler synthesized.
	pub fn is_compiler_synthesized(&self) -> bool {
		self.frames.len() <= 1 && self.is_outer_most_compiler_synthesized()
	}

	fn is_outline_frame(&self) -> bool {
		if let Some(member) = &self.member {
			return member.is_outline_frame();
		}
		self.frames.last().is_some_and(|frame| frame.range.is_outline_frame())
	}

	/// Context for the next line: carries the obfuscated position when this
	/// frame is an outline.
	pub fn context(&self) -> RetraceStackTraceContext {
		match self.obfuscated_position {
			Some(position) if !self.frames.is_empty() && self.is_outline_frame() => {
				RetraceStackTraceContext::empty().with_rewrite_position(position)
			}
			_ => RetraceStackTraceContext::empty(),
		}
	}

	/// Source file of the class holding `method`.
	pub fn source_file(&self, method: &RetracedMethodReference) -> RetracedSourceFile {
		self.class.retracer().source_file(&method.holder_class())
	}
}
