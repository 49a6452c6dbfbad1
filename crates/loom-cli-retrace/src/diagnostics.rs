// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_retrace_core::{Diagnostic, DiagnosticsHandler, Severity};

/// Prints diagnostics to stderr. Informational messages are dropped when
/// quiet.
#[derive(Debug, Clone, Copy)]
pub struct StderrDiagnostics {
	quiet: bool,
}

impl StderrDiagnostics {
	pub fn new(quiet: bool) -> Self {
		Self { quiet }
	}

	fn format(&self, diagnostic: &Diagnostic) -> Option<String> {
		let label = match diagnostic.severity {
			Severity::Error => "Error",
			Severity::Warning => "Warning",
			Severity::Info if self.quiet => return None,
			Severity::Info => "Info",
		};
		Some(format!("{label}: {diagnostic}"))
	}
}

impl DiagnosticsHandler for StderrDiagnostics {
	fn report(&self, diagnostic: Diagnostic) {
		if let Some(line) = self.format(&diagnostic) {
			eprintln!("{line}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_quiet_drops_info_only() {
		let quiet = StderrDiagnostics::new(true);
		assert_eq!(quiet.format(&Diagnostic::info("loaded")), None);
		assert_eq!(
			quiet.format(&Diagnostic::warning("odd").with_line(3)).as_deref(),
			Some("Warning: line 3: odd")
		);
		assert_eq!(
			StderrDiagnostics::new(false).format(&Diagnostic::info("loaded")).as_deref(),
			Some("Info: loaded")
		);
	}
}
