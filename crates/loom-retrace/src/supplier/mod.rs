// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping suppliers.
//!
//! A supplier is told which obfuscated classes a retrace session touches
//! and then builds a [`Retracer`] holding (at least) the mappings of those
//! classes. Suppliers are stateful: every [`MappingSupplier::create_retracer`]
//! call only loads classes registered since the previous call.

mod eager;
mod partitioned;

use std::collections::BTreeSet;
use std::sync::Arc;

use loom_retrace_core::{
	ClassReference, DiagnosticsHandler, FieldReference, MapVersionInfo, MethodReference, TypeReference,
};

use crate::error::Result;
use crate::retracer::Retracer;

pub use eager::{EagerMappingSupplier, MappingSource};
pub use partitioned::{InMemoryPartitions, PartitionSource, PartitionedMappingSupplier};

pub trait MappingSupplier {
	fn register_class_use(&mut self, class: &ClassReference);

	fn register_method_use(&mut self, method: &MethodReference) {
		self.register_class_use(method.holder());
	}

	fn register_field_use(&mut self, field: &FieldReference) {
		self.register_class_use(field.holder());
	}

	/// Primitive types need no mapping.
	fn register_type_use(&mut self, type_reference: &TypeReference) {
		if let Some(class) = type_reference.base_class() {
			self.register_class_use(&class);
		}
	}

	/// Loads whatever is pending and returns a retracer over everything
	/// loaded so far.
	fn create_retracer(&mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<Retracer>;

	/// Versions the mapping declares.
	fn map_versions(&mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<BTreeSet<MapVersionInfo>>;
}
