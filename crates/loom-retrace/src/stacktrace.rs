// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retracing of whole stack traces.

use std::sync::Arc;

use loom_retrace_core::{DiagnosticsHandler, TracingDiagnostics};
use tracing::{info, instrument};

use crate::config::RetraceConfig;
use crate::element::{RetracedElement, StackTraceElementProxyRetracer};
use crate::error::{Result, RetraceError};
use crate::proxy::StackTraceElementStringProxy;
use crate::retracer::{RetraceStackTraceContext, Retracer};
use crate::supplier::MappingSupplier;
use crate::template::StackTraceLineParser;

const OR_MARKER: &str = "<OR> ";

/// The retraced alternatives of one input line.
///
/// Each alternative is the rendered top frame followed by the frames that
/// were inlined into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetracedFrame {
	alternatives: Vec<Vec<String>>,
}

impl RetracedFrame {
	pub fn alternatives(&self) -> &[Vec<String>] {
		&self.alternatives
	}

	pub fn is_ambiguous(&self) -> bool {
		self.alternatives.len() > 1
	}

	/// Flattened lines, with every alternative after the first marked
	/// with `<OR> ` after its leading whitespace.
	pub fn render(&self) -> Vec<String> {
		let mut lines = Vec::new();
		for (index, alternative) in self.alternatives.iter().enumerate() {
			for (position, line) in alternative.iter().enumerate() {
				if index > 0 && position == 0 {
					lines.push(insert_or_marker(line));
				} else {
					lines.push(line.clone());
				}
			}
		}
		lines
	}
}

fn insert_or_marker(line: &str) -> String {
	let indent = line.len() - line.trim_start().len();
	format!("{}{OR_MARKER}{}", &line[..indent], &line[indent..])
}

/// A retraced stack trace and the context left after its last line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceResult {
	frames: Vec<RetracedFrame>,
	context: RetraceStackTraceContext,
}

impl StackTraceResult {
	/// One entry per input line, in input order.
	pub fn frames(&self) -> &[RetracedFrame] {
		&self.frames
	}

	pub fn context(&self) -> &RetraceStackTraceContext {
		&self.context
	}

	pub fn render(&self) -> Vec<String> {
		self.frames.iter().flat_map(RetracedFrame::render).collect()
	}
}

/// The retraced alternatives of a single frame, undeduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetracedFrameResult {
	pub frame: RetracedFrame,
	pub context: RetraceStackTraceContext,
}

/// Every rendered interpretation of a single line, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetracedLineResult {
	pub lines: Vec<String>,
	pub context: RetraceStackTraceContext,
}

/// Parses, loads and retraces stack traces against one mapping supplier.
///
/// The supplier keeps what it loaded between calls, so a retracer used for
/// many traces only fetches each class once.
pub struct StackTraceRetracer<S> {
	supplier: S,
	parser: StackTraceLineParser,
	verbose: bool,
	diagnostics: Arc<dyn DiagnosticsHandler>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for StackTraceRetracer<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StackTraceRetracer")
			.field("supplier", &self.supplier)
			.field("verbose", &self.verbose)
			.finish_non_exhaustive()
	}
}

impl<S: MappingSupplier> StackTraceRetracer<S> {
	pub fn new(supplier: S, parser: StackTraceLineParser) -> Self {
		Self {
			supplier,
			parser,
			verbose: false,
			diagnostics: Arc::new(TracingDiagnostics),
		}
	}

	pub fn from_config(supplier: S, config: &RetraceConfig) -> Result<Self> {
		Ok(Self::new(supplier, config.parser()?).with_verbose(config.verbose))
	}

	pub fn with_verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}

	pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Self {
		self.diagnostics = diagnostics;
		self
	}

	pub fn supplier(&self) -> &S {
		&self.supplier
	}

	pub fn into_supplier(self) -> S {
		self.supplier
	}

	/// Retraces every line of `text`.
	pub fn retrace_str(&mut self, text: &str, context: &RetraceStackTraceContext) -> Result<StackTraceResult> {
		let lines: Vec<Option<String>> = text.lines().map(|line| Some(line.to_string())).collect();
		self.retrace_stack_trace(&lines, context)
	}

	/// Retraces `lines`, threading the context from line to line.
	///
	/// A `None` line aborts the whole call before any mapping is loaded.
	#[instrument(skip_all, fields(lines = lines.len()))]
	pub fn retrace_stack_trace(
		&mut self,
		lines: &[Option<String>],
		context: &RetraceStackTraceContext,
	) -> Result<StackTraceResult> {
		let parsed = self.parse_all(lines)?;
		for proxy in &parsed {
			proxy.register_uses(&mut self.supplier);
		}
		let retracer = self.supplier.create_retracer(Arc::clone(&self.diagnostics))?;
		let proxy_retracer = StackTraceElementProxyRetracer::new(&retracer);

		let mut context = context.clone();
		let mut frames = Vec::with_capacity(parsed.len());
		for proxy in &parsed {
			let (frame, next) = self.retrace_deduplicated(&proxy_retracer, proxy, &context);
			frames.push(frame);
			context = next;
		}
		let ambiguous = frames.iter().filter(|frame| frame.is_ambiguous()).count();
		info!(lines = frames.len(), ambiguous, "Retraced stack trace");
		Ok(StackTraceResult { frames, context })
	}

	/// Retraces one frame, grouping outer frames under their top frame
	/// without deduplication.
	pub fn retrace_frame(&mut self, line: &str, context: &RetraceStackTraceContext) -> Result<RetracedFrameResult> {
		let (proxy, retracer) = self.prepare(line)?;
		let retraced = StackTraceElementProxyRetracer::new(&retracer).retrace(&proxy, context);
		let mut context = context.clone();
		let mut groups: Vec<(RetracedElement, Vec<String>)> = Vec::new();
		for element in retraced.elements {
			let rendered = proxy.render(&element, self.verbose);
			context = element.context().clone();
			match groups.last_mut() {
				Some((_, lines)) if !starts_alternative(&element) => lines.push(rendered),
				_ => groups.push((element, vec![rendered])),
			}
		}
		groups.sort_by(|(one, _), (other, _)| one.compare(other));
		Ok(RetracedFrameResult {
			frame: RetracedFrame {
				alternatives: groups.into_iter().map(|(_, lines)| lines).collect(),
			},
			context,
		})
	}

	/// Retraces one line into a flat list of renderings.
	pub fn retrace_line(&mut self, line: &str, context: &RetraceStackTraceContext) -> Result<RetracedLineResult> {
		let (proxy, retracer) = self.prepare(line)?;
		let retraced = StackTraceElementProxyRetracer::new(&retracer).retrace(&proxy, context);
		let context = retraced
			.elements
			.last()
			.map_or_else(|| context.clone(), |element| element.context().clone());
		let lines = retraced
			.elements
			.iter()
			.map(|element| proxy.render(element, self.verbose))
			.collect();
		Ok(RetracedLineResult { lines, context })
	}

	fn prepare(&mut self, line: &str) -> Result<(StackTraceElementStringProxy, Retracer)> {
		let proxy = self.parser.parse(line)?;
		proxy.register_uses(&mut self.supplier);
		let retracer = self.supplier.create_retracer(Arc::clone(&self.diagnostics))?;
		Ok((proxy, retracer))
	}

	fn parse_all(&self, lines: &[Option<String>]) -> Result<Vec<StackTraceElementStringProxy>> {
		if let Some(index) = lines.iter().position(Option::is_none) {
			self.diagnostics
				.error(&format!("The stack trace line at index {index} is null"));
			return Err(RetraceError::NullStackTraceLine { index });
		}
		lines
			.iter()
			.flatten()
			.map(|line| self.parser.parse(line))
			.collect()
	}

	/// Retraces one line, dropping interpretations that render the same as
	/// an earlier one, and returns the context for the next line.
	fn retrace_deduplicated(
		&self,
		proxy_retracer: &StackTraceElementProxyRetracer<'_>,
		proxy: &StackTraceElementStringProxy,
		context: &RetraceStackTraceContext,
	) -> (RetracedFrame, RetraceStackTraceContext) {
		let retraced = proxy_retracer.retrace(proxy, context);
		let obfuscated_line = proxy.line_number();
		let mut alternatives: Vec<(RetracedElement, Vec<String>)> = Vec::new();
		let mut contexts = Vec::new();
		let mut current: Option<usize> = None;
		for element in retraced.elements {
			if starts_alternative(&element) {
				let seen = alternatives
					.iter()
					.any(|(key, _)| key.equivalent(&element, self.verbose, obfuscated_line));
				if seen {
					// Outer frames of a duplicate are dropped with it.
					current = None;
				} else {
					contexts.push(element.context().clone());
					current = Some(alternatives.len());
					alternatives.push((element.clone(), Vec::new()));
				}
			}
			if let Some(index) = current {
				alternatives[index].1.push(proxy.render(&element, self.verbose));
			}
		}
		alternatives.sort_by(|(one, _), (other, _)| one.compare(other));

		let next = match contexts.as_slice() {
			[] => retraced.context,
			[single] => single.clone(),
			_ => RetraceStackTraceContext::empty(),
		};
		let frame = RetracedFrame {
			alternatives: alternatives.into_iter().map(|(_, lines)| lines).collect(),
		};
		(frame, next)
	}
}

/// Top frames, and lines that retraced no class, open a new alternative;
/// everything else is an outer frame of the preceding one.
fn starts_alternative(element: &RetracedElement) -> bool {
	element.is_top_frame() || element.retraced_class().is_none()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::supplier::{EagerMappingSupplier, MappingSource};
	use loom_retrace_core::CollectingDiagnostics;

	const MAPPING: &str = "\
com.example.Foo -> a.a:
    1:1:void helper():5:5 -> a
    1:1:void caller():30 -> a
    2:2:void run() -> a
";

	fn retracer() -> StackTraceRetracer<EagerMappingSupplier> {
		StackTraceRetracer::new(
			EagerMappingSupplier::new(MappingSource::bytes(MAPPING.as_bytes())),
			StackTraceLineParser::compile(None).unwrap(),
		)
	}

	#[test]
	fn test_or_marker_follows_indentation() {
		let frame = RetracedFrame {
			alternatives: vec![vec!["\tat a".into(), "\tat b".into()], vec!["\tat c".into()]],
		};
		assert_eq!(frame.render(), vec!["\tat a", "\tat b", "\t<OR> at c"]);
		assert!(frame.is_ambiguous());
	}

	#[test]
	fn test_inlined_frames_stay_together() {
		let result = retracer()
			.retrace_str("java.lang.Error: x\n\tat a.a.a(SourceFile:1)", &RetraceStackTraceContext::empty())
			.unwrap();
		assert_eq!(
			result.render(),
			vec![
				"java.lang.Error: x",
				"\tat com.example.Foo.helper(Foo.java:5)",
				"\tat com.example.Foo.caller(Foo.java:30)",
			]
		);
	}

	#[test]
	fn test_null_line_aborts() {
		let diagnostics = Arc::new(CollectingDiagnostics::new());
		let mut retracer = retracer().with_diagnostics(diagnostics.clone());
		let lines = vec![Some("\tat a.a.a(SourceFile:2)".to_string()), None];
		let error = retracer
			.retrace_stack_trace(&lines, &RetraceStackTraceContext::empty())
			.unwrap_err();
		assert!(matches!(error, RetraceError::NullStackTraceLine { index: 1 }));
		assert!(diagnostics.has_errors());
		assert_eq!(retracer.supplier().pending_classes().count(), 0);
	}

	#[test]
	fn test_retrace_line_is_flat() {
		let result = retracer()
			.retrace_line("\tat a.a.a(SourceFile:1)", &RetraceStackTraceContext::empty())
			.unwrap();
		assert_eq!(result.lines.len(), 2);
	}

	#[test]
	fn test_retrace_frame_groups_outer_frames() {
		let result = retracer()
			.retrace_frame("\tat a.a.a(SourceFile:1)", &RetraceStackTraceContext::empty())
			.unwrap();
		assert_eq!(result.frame.alternatives().len(), 1);
		assert_eq!(result.frame.alternatives()[0].len(), 2);
	}

	#[test]
	fn test_unknown_lines_render_verbatim() {
		let result = retracer()
			.retrace_str("   ... 3 more\n\tat b.b.b(SourceFile:9)", &RetraceStackTraceContext::empty())
			.unwrap();
		assert_eq!(result.render(), vec!["   ... 3 more", "\tat b.b.b(SourceFile:9)"]);
	}
}
