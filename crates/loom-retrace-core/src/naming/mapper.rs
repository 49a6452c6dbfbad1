// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::class::ClassNaming;
use super::version::{MapVersion, MapVersionInfo};

/// A mergeable table of class namings.
///
/// More than one naming may exist for the same renamed name once several
/// mapping fragments have been combined; lookups return all of them.
#[derive(Debug, Clone, Default)]
pub struct ClassNameMapper {
	classes: Vec<Arc<ClassNaming>>,
	by_renamed: HashMap<String, Vec<usize>>,
	by_original: HashMap<String, usize>,
	preamble: Vec<String>,
	map_versions: BTreeSet<MapVersionInfo>,
	first_map_version: Option<MapVersionInfo>,
	file_names: HashMap<String, String>,
}

impl ClassNameMapper {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	/// All class namings in the order they were added.
	pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassNaming>> {
		self.classes.iter()
	}

	/// Class namings whose renamed (obfuscated) name matches.
	pub fn class_namings(&self, renamed_name: &str) -> Vec<Arc<ClassNaming>> {
		self.by_renamed
			.get(renamed_name)
			.map(|indices| indices.iter().map(|&index| Arc::clone(&self.classes[index])).collect())
			.unwrap_or_default()
	}

	pub fn class_naming_for_original(&self, original_name: &str) -> Option<&Arc<ClassNaming>> {
		self.by_original.get(original_name).map(|&index| &self.classes[index])
	}

	/// Source file of an original type, from its class naming first and
	/// then from partition annotations.
	pub fn source_file_for(&self, original_name: &str) -> Option<&str> {
		self.class_naming_for_original(original_name)
			.and_then(|naming| naming.source_file())
			.or_else(|| self.file_names.get(original_name).map(String::as_str))
	}

	pub fn preamble(&self) -> &[String] {
		&self.preamble
	}

	pub fn map_versions(&self) -> &BTreeSet<MapVersionInfo> {
		&self.map_versions
	}

	/// The first map version marker seen, or `Unknown`.
	pub fn map_version(&self) -> MapVersion {
		self.first_map_version
			.as_ref()
			.map(|info| info.version)
			.unwrap_or(MapVersion::Unknown)
	}

	pub fn first_map_version(&self) -> Option<&MapVersionInfo> {
		self.first_map_version.as_ref()
	}

	pub fn add_class(&mut self, naming: ClassNaming) {
		self.insert(Arc::new(naming));
	}

	pub fn set_preamble(&mut self, preamble: Vec<String>) {
		self.preamble = preamble;
	}

	pub(crate) fn push_preamble_line(&mut self, line: String) {
		self.preamble.push(line);
	}

	pub fn add_map_version(&mut self, info: MapVersionInfo) {
		if self.first_map_version.is_none() {
			self.first_map_version = Some(info.clone());
		}
		self.map_versions.insert(info);
	}

	pub fn add_file_name(&mut self, original_name: impl Into<String>, file_name: impl Into<String>) {
		self.file_names.entry(original_name.into()).or_insert_with(|| file_name.into());
	}

	/// Merges `other` into this table.
	///
	/// A class naming already present under the same renamed and original
	/// name is kept as is. The preamble of `other` is taken only when this
	/// table has none.
	pub fn combine(&mut self, other: ClassNameMapper) {
		for naming in other.classes {
			let duplicate = self
				.by_renamed
				.get(naming.renamed_name())
				.is_some_and(|indices| {
					indices
						.iter()
						.any(|&index| self.classes[index].original_name() == naming.original_name())
				});
			if !duplicate {
				self.insert(naming);
			}
		}
		if self.preamble.is_empty() {
			self.preamble = other.preamble;
		}
		if let Some(info) = other.first_map_version {
			if self.first_map_version.is_none() {
				self.first_map_version = Some(info);
			}
		}
		self.map_versions.extend(other.map_versions);
		for (original, file) in other.file_names {
			self.file_names.entry(original).or_insert(file);
		}
	}

	fn insert(&mut self, naming: Arc<ClassNaming>) {
		let index = self.classes.len();
		self.by_renamed
			.entry(naming.renamed_name().to_string())
			.or_default()
			.push(index);
		self.by_original
			.entry(naming.original_name().to_string())
			.or_insert(index);
		self.classes.push(naming);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn mapper_with(classes: &[(&str, &str)]) -> ClassNameMapper {
		let mut mapper = ClassNameMapper::new();
		for (original, renamed) in classes {
			mapper.add_class(ClassNaming::new(*original, *renamed));
		}
		mapper
	}

	#[test]
	fn test_lookup_by_renamed_and_original() {
		let mapper = mapper_with(&[("com.Foo", "a"), ("com.Bar", "b")]);
		assert_eq!(mapper.class_namings("a")[0].original_name(), "com.Foo");
		assert!(mapper.class_namings("c").is_empty());
		assert_eq!(
			mapper.class_naming_for_original("com.Bar").map(|n| n.renamed_name()),
			Some("b")
		);
	}

	#[test]
	fn test_combine_appends_distinct_and_skips_duplicates() {
		let mut left = mapper_with(&[("com.Foo", "a")]);
		let right = mapper_with(&[("com.Foo", "a"), ("com.Other", "a"), ("com.Bar", "b")]);
		left.combine(right);

		assert_eq!(left.len(), 3);
		assert_eq!(left.class_namings("a").len(), 2);
		assert_eq!(left.class_namings("b").len(), 1);
	}

	#[test]
	fn test_combine_keeps_first_map_version_and_preamble() {
		let mut left = ClassNameMapper::new();
		left.add_map_version(MapVersionInfo::new(MapVersion::V2_0));
		let mut right = ClassNameMapper::new();
		right.add_map_version(MapVersionInfo::new(MapVersion::V2_2));
		right.set_preamble(vec!["# compiler: R8".into()]);
		left.combine(right);

		assert_eq!(left.map_version(), MapVersion::V2_0);
		assert_eq!(left.map_versions().len(), 2);
		assert_eq!(left.preamble(), ["# compiler: R8".to_string()]);
	}

	#[test]
	fn test_source_file_falls_back_to_file_names() {
		let mut mapper = mapper_with(&[("com.Foo", "a")]);
		mapper.add_file_name("com.Util", "Util.kt");
		assert_eq!(mapper.source_file_for("com.Util"), Some("Util.kt"));
		assert_eq!(mapper.source_file_for("com.Foo"), None);
	}
}
