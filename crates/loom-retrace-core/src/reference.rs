// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! References to classes, types, methods and fields.
//!
//! Names are stored in their dotted Java source form (`com.example.Foo`).
//! Binary names (`com/example/Foo`) and descriptors (`Lcom/example/Foo;`)
//! are derived on demand.

use std::fmt;

const PRIMITIVE_TYPES: [&str; 8] = [
	"boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// A reference to a class by its dotted type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassReference {
	type_name: String,
}

impl ClassReference {
	pub fn from_type_name(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
		}
	}

	pub fn from_binary_name(binary_name: &str) -> Self {
		Self::from_type_name(binary_name.replace('/', "."))
	}

	/// Parses a class descriptor such as `Ljava/lang/Object;`.
	pub fn from_descriptor(descriptor: &str) -> Option<Self> {
		let inner = descriptor.strip_prefix('L')?.strip_suffix(';')?;
		if inner.is_empty() {
			return None;
		}
		Some(Self::from_binary_name(inner))
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	pub fn binary_name(&self) -> String {
		self.type_name.replace('.', "/")
	}

	pub fn descriptor(&self) -> String {
		format!("L{};", self.binary_name())
	}

	/// The name after the last package separator.
	pub fn simple_name(&self) -> &str {
		match self.type_name.rfind('.') {
			Some(index) => &self.type_name[index + 1..],
			None => &self.type_name,
		}
	}

	pub fn package_name(&self) -> &str {
		match self.type_name.rfind('.') {
			Some(index) => &self.type_name[..index],
			None => "",
		}
	}
}

impl fmt::Display for ClassReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.type_name)
	}
}

/// A reference to a primitive, class or array type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeReference {
	type_name: String,
}

impl TypeReference {
	pub fn from_type_name(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
		}
	}

	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	pub fn is_primitive(&self) -> bool {
		PRIMITIVE_TYPES.contains(&self.type_name.as_str())
	}

	pub fn is_array(&self) -> bool {
		self.type_name.ends_with("[]")
	}

	pub fn dimensions(&self) -> usize {
		let mut name = self.type_name.as_str();
		let mut dimensions = 0;
		while let Some(stripped) = name.strip_suffix("[]") {
			name = stripped;
			dimensions += 1;
		}
		dimensions
	}

	/// The element type name with all array dimensions removed.
	pub fn base_type_name(&self) -> &str {
		let dimensions = self.dimensions();
		&self.type_name[..self.type_name.len() - 2 * dimensions]
	}

	/// The class at the bottom of this type, if it is not primitive.
	pub fn base_class(&self) -> Option<ClassReference> {
		let base = self.base_type_name();
		if base.is_empty() || PRIMITIVE_TYPES.contains(&base) || base == "void" {
			return None;
		}
		Some(ClassReference::from_type_name(base))
	}

	/// Replaces the base type while keeping the array dimensions.
	pub fn with_base(&self, base_type_name: &str) -> Self {
		let mut type_name = base_type_name.to_string();
		for _ in 0..self.dimensions() {
			type_name.push_str("[]");
		}
		Self { type_name }
	}
}

impl From<&ClassReference> for TypeReference {
	fn from(class: &ClassReference) -> Self {
		Self::from_type_name(class.type_name())
	}
}

impl fmt::Display for TypeReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.type_name)
	}
}

/// A fully specified method reference. A `None` return type means `void`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
	holder: ClassReference,
	name: String,
	formal_types: Vec<TypeReference>,
	return_type: Option<TypeReference>,
}

impl MethodReference {
	pub fn new(
		holder: ClassReference,
		name: impl Into<String>,
		formal_types: Vec<TypeReference>,
		return_type: Option<TypeReference>,
	) -> Self {
		Self {
			holder,
			name: name.into(),
			formal_types,
			return_type,
		}
	}

	pub fn holder(&self) -> &ClassReference {
		&self.holder
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn formal_types(&self) -> &[TypeReference] {
		&self.formal_types
	}

	pub fn return_type(&self) -> Option<&TypeReference> {
		self.return_type.as_ref()
	}

	pub fn with_holder(&self, holder: ClassReference) -> Self {
		Self {
			holder,
			..self.clone()
		}
	}
}

impl fmt::Display for MethodReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let return_type = self
			.return_type
			.as_ref()
			.map(TypeReference::type_name)
			.unwrap_or("void");
		write!(f, "{return_type} {}.{}(", self.holder, self.name)?;
		for (index, formal) in self.formal_types.iter().enumerate() {
			if index > 0 {
				f.write_str(",")?;
			}
			f.write_str(formal.type_name())?;
		}
		f.write_str(")")
	}
}

/// A fully specified field reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
	holder: ClassReference,
	name: String,
	field_type: TypeReference,
}

impl FieldReference {
	pub fn new(holder: ClassReference, name: impl Into<String>, field_type: TypeReference) -> Self {
		Self {
			holder,
			name: name.into(),
			field_type,
		}
	}

	pub fn holder(&self) -> &ClassReference {
		&self.holder
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn field_type(&self) -> &TypeReference {
		&self.field_type
	}
}

impl fmt::Display for FieldReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}.{}", self.field_type, self.holder, self.name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_class_reference_names() {
		let class = ClassReference::from_binary_name("com/example/Foo$Bar");
		assert_eq!(class.type_name(), "com.example.Foo$Bar");
		assert_eq!(class.binary_name(), "com/example/Foo$Bar");
		assert_eq!(class.descriptor(), "Lcom/example/Foo$Bar;");
		assert_eq!(class.simple_name(), "Foo$Bar");
		assert_eq!(class.package_name(), "com.example");
	}

	#[test]
	fn test_class_reference_from_descriptor() {
		assert_eq!(
			ClassReference::from_descriptor("Ljava/lang/NullPointerException;"),
			Some(ClassReference::from_type_name("java.lang.NullPointerException"))
		);
		assert_eq!(ClassReference::from_descriptor("I"), None);
		assert_eq!(ClassReference::from_descriptor("L;"), None);
	}

	#[test]
	fn test_type_reference_arrays() {
		let array = TypeReference::from_type_name("a.b[][]");
		assert!(array.is_array());
		assert_eq!(array.dimensions(), 2);
		assert_eq!(array.base_type_name(), "a.b");
		assert_eq!(array.base_class(), Some(ClassReference::from_type_name("a.b")));
		assert_eq!(array.with_base("com.Foo").type_name(), "com.Foo[][]");
	}

	#[test]
	fn test_primitive_types_have_no_base_class() {
		assert!(TypeReference::from_type_name("int").is_primitive());
		assert_eq!(TypeReference::from_type_name("int[]").base_class(), None);
		assert_eq!(TypeReference::from_type_name("void").base_class(), None);
	}

	#[test]
	fn test_method_reference_display() {
		let method = MethodReference::new(
			ClassReference::from_type_name("com.Foo"),
			"bar",
			vec![
				TypeReference::from_type_name("int"),
				TypeReference::from_type_name("java.lang.String"),
			],
			None,
		);
		assert_eq!(method.to_string(), "void com.Foo.bar(int,java.lang.String)");
	}
}
