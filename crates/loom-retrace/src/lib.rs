// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retracing of obfuscated JVM stack traces.
//!
//! This crate provides:
//! - Mapping suppliers that load a whole mapping or fetch partitions on demand
//! - A template compiler for stack trace line formats
//! - The resolution engine mapping obfuscated classes, methods, fields and
//!   frames to their original candidates
//! - A stack trace driver that threads context from line to line and
//!   renders ambiguous lines with `<OR>` markers
//! - Layered configuration (`LOOM_RETRACE_*`, `retrace.toml`)
//!
//! # Example
//!
//! ```
//! use loom_retrace::{
//!     EagerMappingSupplier, MappingSource, RetraceStackTraceContext, StackTraceLineParser,
//!     StackTraceRetracer,
//! };
//!
//! let mapping = "com.example.Foo -> a.a:\n    10:10:void bar() -> b\n";
//! let supplier = EagerMappingSupplier::new(MappingSource::bytes(mapping.as_bytes()));
//! let mut retracer = StackTraceRetracer::new(supplier, StackTraceLineParser::compile(None).unwrap());
//!
//! let result = retracer
//!     .retrace_str("\tat a.a.b(SourceFile:10)", &RetraceStackTraceContext::empty())
//!     .unwrap();
//! assert_eq!(result.render(), vec!["\tat com.example.Foo.bar(Foo.java:10)"]);
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod proxy;
pub mod retracer;
pub mod stacktrace;
pub mod supplier;
pub mod template;

pub use config::{load_config, load_config_with_file, RetraceConfig, RetraceConfigLayer};
pub use element::{RetracedElement, RetracedElements, StackTraceElementProxyRetracer};
pub use error::{ConfigError, Result, RetraceError};
pub use proxy::{ClassNameType, StackTraceElementStringProxy, StackTraceElementStringProxyBuilder};
pub use retracer::{
	MethodDefinition, RetraceClassElement, RetraceClassResult, RetraceFieldElement, RetraceFieldResult,
	RetraceFrameElement, RetraceFrameResult, RetraceMethodElement, RetraceMethodResult, RetraceStackTraceContext,
	RetraceThrownExceptionElement, RetraceTypeResult, RetracedClassReference, RetracedFieldReference,
	RetracedMethodReference, RetracedSingleFrame, RetracedSourceFile, RetracedTypeReference, Retracer,
};
pub use stacktrace::{RetracedFrame, RetracedFrameResult, RetracedLineResult, StackTraceResult, StackTraceRetracer};
pub use supplier::{
	EagerMappingSupplier, InMemoryPartitions, MappingSource, MappingSupplier, PartitionSource,
	PartitionedMappingSupplier,
};
pub use template::{StackTraceLineParser, DEFAULT_TEMPLATE};
