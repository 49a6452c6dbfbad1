// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use crate::reference::{ClassReference, FieldReference, MethodReference, TypeReference};

/// Original method signature as written in a mapping.
///
/// Methods inlined from another class carry a qualified name
/// (`com.example.Util.helper`); [`MethodSignature::holder`] splits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
	pub name: String,
	pub return_type: String,
	pub parameters: Vec<String>,
}

impl MethodSignature {
	pub fn new(name: impl Into<String>, return_type: impl Into<String>, parameters: Vec<String>) -> Self {
		Self {
			name: name.into(),
			return_type: return_type.into(),
			parameters,
		}
	}

	pub fn is_qualified(&self) -> bool {
		self.name.contains('.')
	}

	/// Holder of a qualified method name.
	pub fn holder(&self) -> Option<&str> {
		self.name.rfind('.').map(|index| &self.name[..index])
	}

	pub fn simple_name(&self) -> &str {
		match self.name.rfind('.') {
			Some(index) => &self.name[index + 1..],
			None => &self.name,
		}
	}

	/// Builds a method reference, using `default_holder` unless the name is qualified.
	pub fn to_method_reference(&self, default_holder: &ClassReference) -> MethodReference {
		let holder = self
			.holder()
			.map(ClassReference::from_type_name)
			.unwrap_or_else(|| default_holder.clone());
		let return_type = (self.return_type != "void")
			.then(|| TypeReference::from_type_name(self.return_type.clone()));
		MethodReference::new(
			holder,
			self.simple_name(),
			self.parameters
				.iter()
				.map(|parameter| TypeReference::from_type_name(parameter.clone()))
				.collect(),
			return_type,
		)
	}

	/// Every type name this signature mentions, including a qualified holder.
	pub fn referenced_types(&self) -> impl Iterator<Item = &str> {
		std::iter::once(self.return_type.as_str())
			.chain(self.parameters.iter().map(String::as_str))
			.chain(self.holder())
	}
}

impl fmt::Display for MethodSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}({})", self.return_type, self.name, self.parameters.join(","))
	}
}

/// Original field signature as written in a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSignature {
	pub name: String,
	pub field_type: String,
}

impl FieldSignature {
	pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			field_type: field_type.into(),
		}
	}

	pub fn holder(&self) -> Option<&str> {
		self.name.rfind('.').map(|index| &self.name[..index])
	}

	pub fn simple_name(&self) -> &str {
		match self.name.rfind('.') {
			Some(index) => &self.name[index + 1..],
			None => &self.name,
		}
	}

	pub fn to_field_reference(&self, default_holder: &ClassReference) -> FieldReference {
		let holder = self
			.holder()
			.map(ClassReference::from_type_name)
			.unwrap_or_else(|| default_holder.clone());
		FieldReference::new(
			holder,
			self.simple_name(),
			TypeReference::from_type_name(self.field_type.clone()),
		)
	}
}

impl fmt::Display for FieldSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.field_type, self.name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
	Method(MethodSignature),
	Field(FieldSignature),
}

impl Signature {
	pub fn name(&self) -> &str {
		match self {
			Signature::Method(method) => &method.name,
			Signature::Field(field) => &field.name,
		}
	}

	pub fn as_method(&self) -> Option<&MethodSignature> {
		match self {
			Signature::Method(method) => Some(method),
			Signature::Field(_) => None,
		}
	}

	pub fn as_field(&self) -> Option<&FieldSignature> {
		match self {
			Signature::Field(field) => Some(field),
			Signature::Method(_) => None,
		}
	}
}

impl fmt::Display for Signature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Signature::Method(method) => method.fmt(f),
			Signature::Field(field) => field.fmt(f),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_qualified_method_signature() {
		let signature = MethodSignature::new("com.example.Util.helper", "int", vec!["long".into()]);
		assert!(signature.is_qualified());
		assert_eq!(signature.holder(), Some("com.example.Util"));
		assert_eq!(signature.simple_name(), "helper");

		let method = signature.to_method_reference(&ClassReference::from_type_name("com.Other"));
		assert_eq!(method.holder().type_name(), "com.example.Util");
		assert_eq!(method.name(), "helper");
		assert_eq!(method.return_type().map(|t| t.type_name()), Some("int"));
	}

	#[test]
	fn test_void_return_becomes_none() {
		let signature = MethodSignature::new("run", "void", vec![]);
		let method = signature.to_method_reference(&ClassReference::from_type_name("com.Foo"));
		assert_eq!(method.holder().type_name(), "com.Foo");
		assert!(method.return_type().is_none());
		assert_eq!(signature.to_string(), "void run()");
	}

	#[test]
	fn test_referenced_types() {
		let signature = MethodSignature::new(
			"com.Util.helper",
			"com.Result",
			vec!["int".into(), "com.Arg[]".into()],
		);
		let types: Vec<&str> = signature.referenced_types().collect();
		assert_eq!(types, vec!["com.Result", "int", "com.Arg[]", "com.Util"]);
	}
}
