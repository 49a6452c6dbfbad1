// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retraced identifiers.
//!
//! Every retraced identifier is either `Known`, when the mapping had data
//! for it, or `Unknown`, in which case only the obfuscated name (and, for
//! members, the retraced holder) is available.

use std::cmp::Ordering;

use loom_retrace_core::{ClassReference, FieldReference, MethodReference, TypeReference};

/// Source file names that are reported as is, never inferred.
const KEEP_SOURCE_FILE_NAMES: [&str; 3] = ["Native Method", "Unknown Source", "Unknown"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetracedClassReference {
	Known(ClassReference),
	Unknown(ClassReference),
}

impl RetracedClassReference {
	pub fn class_reference(&self) -> &ClassReference {
		match self {
			Self::Known(class) | Self::Unknown(class) => class,
		}
	}

	pub fn type_name(&self) -> &str {
		self.class_reference().type_name()
	}

	pub fn binary_name(&self) -> String {
		self.class_reference().binary_name()
	}

	pub fn is_known(&self) -> bool {
		matches!(self, Self::Known(_))
	}

	pub fn is_unknown(&self) -> bool {
		!self.is_known()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetracedTypeReference {
	Void,
	Type(TypeReference),
}

impl RetracedTypeReference {
	pub fn is_void(&self) -> bool {
		matches!(self, Self::Void)
	}

	pub fn type_name(&self) -> &str {
		match self {
			Self::Void => "void",
			Self::Type(reference) => reference.type_name(),
		}
	}

	/// Compares by voidness and then type name.
	pub(crate) fn same_type(&self, other: &Self) -> bool {
		self.is_void() == other.is_void() && (self.is_void() || self.type_name() == other.type_name())
	}
}

/// How much is known about a method being looked up: only its name, or its
/// full signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodDefinition {
	Base { holder: ClassReference, name: String },
	Full(MethodReference),
}

impl MethodDefinition {
	pub fn base(holder: ClassReference, name: impl Into<String>) -> Self {
		Self::Base {
			holder,
			name: name.into(),
		}
	}

	pub fn holder(&self) -> &ClassReference {
		match self {
			Self::Base { holder, .. } => holder,
			Self::Full(method) => method.holder(),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Base { name, .. } => name,
			Self::Full(method) => method.name(),
		}
	}

	pub fn substitute_holder(&self, holder: ClassReference) -> Self {
		match self {
			Self::Base { name, .. } => Self::Base {
				holder,
				name: name.clone(),
			},
			Self::Full(method) => Self::Full(method.with_holder(holder)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetracedMethodReference {
	Known {
		method: MethodReference,
		position: Option<i32>,
	},
	Unknown {
		holder: RetracedClassReference,
		definition: MethodDefinition,
		position: Option<i32>,
	},
}

impl RetracedMethodReference {
	pub fn holder_class(&self) -> RetracedClassReference {
		match self {
			Self::Known { method, .. } => RetracedClassReference::Known(method.holder().clone()),
			Self::Unknown { holder, .. } => holder.clone(),
		}
	}

	pub fn method_name(&self) -> &str {
		match self {
			Self::Known { method, .. } => method.name(),
			Self::Unknown { definition, .. } => definition.name(),
		}
	}

	pub fn method_reference(&self) -> Option<&MethodReference> {
		match self {
			Self::Known { method, .. } => Some(method),
			Self::Unknown { .. } => None,
		}
	}

	pub fn original_position(&self) -> Option<i32> {
		match self {
			Self::Known { position, .. } | Self::Unknown { position, .. } => *position,
		}
	}

	pub fn original_position_or_default(&self, default: i32) -> i32 {
		self.original_position().unwrap_or(default)
	}

	pub fn is_known(&self) -> bool {
		matches!(self, Self::Known { .. })
	}

	pub fn is_unknown(&self) -> bool {
		!self.is_known()
	}

	/// `return name(arguments)` for known methods, the bare name otherwise.
	pub fn verbose_description(&self) -> String {
		match self {
			Self::Known { method, .. } => {
				let return_type = method.return_type().map(TypeReference::type_name).unwrap_or("void");
				let arguments: Vec<&str> = method.formal_types().iter().map(TypeReference::type_name).collect();
				format!("{return_type} {}({})", method.name(), arguments.join(","))
			}
			Self::Unknown { definition, .. } => definition.name().to_string(),
		}
	}

	/// Orders by name, then known before unknown, then signature and position.
	pub fn compare(&self, other: &Self) -> Ordering {
		self.method_name()
			.cmp(other.method_name())
			.then_with(|| other.is_known().cmp(&self.is_known()))
			.then_with(|| self.verbose_description().cmp(&other.verbose_description()))
			.then_with(|| self.original_position().cmp(&other.original_position()))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RetracedFieldReference {
	Known(FieldReference),
	Unknown {
		holder: RetracedClassReference,
		name: String,
	},
}

impl RetracedFieldReference {
	pub fn holder_class(&self) -> RetracedClassReference {
		match self {
			Self::Known(field) => RetracedClassReference::Known(field.holder().clone()),
			Self::Unknown { holder, .. } => holder.clone(),
		}
	}

	pub fn field_name(&self) -> &str {
		match self {
			Self::Known(field) => field.name(),
			Self::Unknown { name, .. } => name,
		}
	}

	pub fn field_type(&self) -> Option<&TypeReference> {
		match self {
			Self::Known(field) => Some(field.field_type()),
			Self::Unknown { .. } => None,
		}
	}

	pub fn is_known(&self) -> bool {
		matches!(self, Self::Known(_))
	}

	pub fn is_unknown(&self) -> bool {
		!self.is_known()
	}

	/// `type name` for known fields, the bare name otherwise.
	pub fn verbose_description(&self) -> String {
		match self {
			Self::Known(field) => format!("{} {}", field.field_type(), field.name()),
			Self::Unknown { name, .. } => name.clone(),
		}
	}
}

/// The source file of a retraced class, possibly absent from the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetracedSourceFile {
	file_name: Option<String>,
	class: RetracedClassReference,
}

impl RetracedSourceFile {
	pub fn new(file_name: Option<String>, class: RetracedClassReference) -> Self {
		Self { file_name, class }
	}

	pub fn file_name(&self) -> Option<&str> {
		self.file_name.as_deref()
	}

	/// The mapped source file, or one inferred from the retraced class.
	///
	/// Inference only happens when the class was retraced. The outer-most
	/// class name is used with a `.kt` extension when the obfuscated file
	/// name had one and `.java` otherwise.
	pub fn or_infer(&self, obfuscated_file_name: &str) -> String {
		if let Some(file_name) = &self.file_name {
			return file_name.clone();
		}
		if self.class.is_unknown() || KEEP_SOURCE_FILE_NAMES.contains(&obfuscated_file_name) {
			return obfuscated_file_name.to_string();
		}
		let simple_name = self.class.class_reference().simple_name();
		let outer_most = match simple_name.find('$') {
			Some(index) if index > 0 => &simple_name[..index],
			_ => simple_name,
		};
		let extension = if obfuscated_file_name.ends_with(".kt") {
			"kt"
		} else {
			"java"
		};
		format!("{outer_most}.{extension}")
	}
}
