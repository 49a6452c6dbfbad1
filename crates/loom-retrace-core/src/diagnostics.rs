// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Diagnostics sink used by mapping readers, suppliers and the retracer.
//!
//! Structural failures are reported here before the corresponding `Err` is
//! returned, so callers that only look at the sink still see them.

use std::fmt;
use std::sync::Mutex;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	Info,
	Warning,
	Error,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub severity: Severity,
	pub message: String,
	/// 1-based line in the input the diagnostic refers to, if any.
	pub line: Option<usize>,
}

impl Diagnostic {
	pub fn new(severity: Severity, message: impl Into<String>) -> Self {
		Self {
			severity,
			message: message.into(),
			line: None,
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self::new(Severity::Error, message)
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self::new(Severity::Warning, message)
	}

	pub fn info(message: impl Into<String>) -> Self {
		Self::new(Severity::Info, message)
	}

	pub fn with_line(mut self, line: usize) -> Self {
		self.line = Some(line);
		self
	}
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.line {
			Some(line) => write!(f, "line {line}: {}", self.message),
			None => f.write_str(&self.message),
		}
	}
}

/// Receives diagnostics produced while reading mappings and retracing.
pub trait DiagnosticsHandler: Send + Sync {
	fn report(&self, diagnostic: Diagnostic);

	fn error(&self, message: &str) {
		self.report(Diagnostic::error(message));
	}

	fn warning(&self, message: &str) {
		self.report(Diagnostic::warning(message));
	}

	fn info(&self, message: &str) {
		self.report(Diagnostic::info(message));
	}
}

/// Forwards diagnostics to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsHandler for TracingDiagnostics {
	fn report(&self, diagnostic: Diagnostic) {
		match diagnostic.severity {
			Severity::Error => tracing::error!(line = ?diagnostic.line, "{}", diagnostic.message),
			Severity::Warning => tracing::warn!(line = ?diagnostic.line, "{}", diagnostic.message),
			Severity::Info => tracing::info!(line = ?diagnostic.line, "{}", diagnostic.message),
		}
	}
}

/// Records every diagnostic it receives.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
	entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		self.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}

	pub fn count(&self, severity: Severity) -> usize {
		self.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.iter()
			.filter(|d| d.severity == severity)
			.count()
	}

	pub fn has_errors(&self) -> bool {
		self.count(Severity::Error) > 0
	}
}

impl DiagnosticsHandler for CollectingDiagnostics {
	fn report(&self, diagnostic: Diagnostic) {
		self.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(diagnostic);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_collecting_diagnostics_counts_by_severity() {
		let sink = CollectingDiagnostics::new();
		sink.error("broken");
		sink.warning("odd");
		sink.warning("odder");
		sink.report(Diagnostic::info("fyi").with_line(3));

		assert!(sink.has_errors());
		assert_eq!(sink.count(Severity::Warning), 2);
		assert_eq!(sink.diagnostics()[3].line, Some(3));
	}

	#[test]
	fn test_display_includes_line() {
		let diagnostic = Diagnostic::error("bad arrow").with_line(12);
		assert_eq!(diagnostic.to_string(), "line 12: bad arrow");
		assert_eq!(Diagnostic::warning("plain").to_string(), "plain");
	}
}
