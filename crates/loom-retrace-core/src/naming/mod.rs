// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The mapping model: what a mapping file says about each obfuscated class.

mod class;
mod info;
mod mapper;
mod range;
mod reader;
mod signature;
mod version;

pub use class::{ClassNaming, MappedRange, MemberNaming};
pub use info::{
	MappingInformation, OutlineCallsite, RewriteAction, RewriteCondition, RewriteFrame,
	PARTITION_SOURCE_FILES_ID,
};
pub use mapper::ClassNameMapper;
pub use range::Range;
pub use reader::ParseOptions;
pub use signature::{FieldSignature, MethodSignature, Signature};
pub use version::{MapVersion, MapVersionInfo};
