// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for retracing obfuscated JVM stack traces.
//!
//! This crate provides:
//! - Class, type, method and field references
//! - The mapping model (`ClassNameMapper`, `ClassNaming`, `MappedRange`, `MemberNaming`)
//! - A reader for ProGuard/R8 style mapping files
//! - Boundary-safe line readers over memory-mapped files and byte streams
//! - A diagnostics sink abstraction
//!
//! # Example
//!
//! ```
//! use loom_retrace_core::ClassNameMapper;
//!
//! let mapper = ClassNameMapper::parse_str(
//!     "com.example.Foo -> a.a:\n    10:10:void bar() -> b\n",
//! )
//! .unwrap();
//!
//! let naming = &mapper.class_namings("a.a")[0];
//! assert_eq!(naming.original_name(), "com.example.Foo");
//! assert_eq!(naming.mapped_ranges("b").len(), 1);
//! ```

pub mod diagnostics;
pub mod error;
pub mod line_reader;
pub mod naming;
pub mod reference;

pub use diagnostics::{
	CollectingDiagnostics, Diagnostic, DiagnosticsHandler, Severity, TracingDiagnostics,
};
pub use error::{MappingError, Result};
pub use line_reader::{is_class_header, LineReader, MapLineReader, MappedChunks, StreamChunks};
pub use naming::{
	ClassNameMapper, ClassNaming, FieldSignature, MapVersion, MapVersionInfo, MappedRange,
	MappingInformation, MemberNaming, MethodSignature, OutlineCallsite, ParseOptions, Range,
	RewriteAction, RewriteCondition, RewriteFrame, Signature,
};
pub use reference::{ClassReference, FieldReference, MethodReference, TypeReference};
