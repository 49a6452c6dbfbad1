// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexSet;
use loom_retrace_core::{
	ClassNameMapper, ClassReference, DiagnosticsHandler, MapLineReader, MapVersionInfo, ParseOptions,
};
use loom_retrace_partition::{LazyPartitionMetadata, MappingPartition};
use tracing::{debug, instrument, trace};

use super::MappingSupplier;
use crate::error::Result;
use crate::retracer::Retracer;

/// Storage the partitioned supplier fetches from.
///
/// Every callback runs on the caller's thread and may block.
pub trait PartitionSource {
	/// The payload stored under `key`, or `None` when there is no such
	/// partition.
	fn fetch(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

	/// Called once for every key that becomes pending. Keys that named
	/// metadata does not list never become pending and are not reported.
	fn on_interest(&mut self, _key: &str) {}

	/// Called once before the pending keys of a load are fetched.
	fn on_prepare(&mut self) -> Result<()> {
		Ok(())
	}
}

/// Partitions held in memory, with a log of fetched keys.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartitions {
	partitions: HashMap<String, Vec<u8>>,
	fetched: Vec<String>,
	interests: Vec<String>,
	prepared: usize,
}

impl InMemoryPartitions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, partition: MappingPartition) {
		self.partitions.insert(partition.key, partition.payload);
	}

	pub fn fetched(&self) -> &[String] {
		&self.fetched
	}

	pub fn interests(&self) -> &[String] {
		&self.interests
	}

	/// Number of prepare callbacks received.
	pub fn prepared(&self) -> usize {
		self.prepared
	}
}

impl FromIterator<MappingPartition> for InMemoryPartitions {
	fn from_iter<I: IntoIterator<Item = MappingPartition>>(iter: I) -> Self {
		let mut partitions = Self::new();
		for partition in iter {
			partitions.insert(partition);
		}
		partitions
	}
}

impl PartitionSource for InMemoryPartitions {
	fn fetch(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
		self.fetched.push(key.to_string());
		Ok(self.partitions.get(key).cloned())
	}

	fn on_interest(&mut self, key: &str) {
		self.interests.push(key.to_string());
	}

	fn on_prepare(&mut self) -> Result<()> {
		self.prepared += 1;
		Ok(())
	}
}

/// Builds the mapping from partitions fetched on demand.
///
/// Keys are fetched in registration order, each at most once per supplier.
pub struct PartitionedMappingSupplier<P> {
	source: P,
	metadata: LazyPartitionMetadata,
	parse_options: ParseOptions,
	mapper: Option<Arc<ClassNameMapper>>,
	pending: IndexSet<String>,
	built: HashSet<String>,
}

impl<P> std::fmt::Debug for PartitionedMappingSupplier<P> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PartitionedMappingSupplier")
			.field("strategy", &self.metadata.strategy())
			.field("pending", &self.pending)
			.field("built", &self.built.len())
			.finish_non_exhaustive()
	}
}

impl<P: PartitionSource> PartitionedMappingSupplier<P> {
	/// `metadata` is the serialized partition metadata; only its header is
	/// decoded up front.
	pub fn new(metadata: impl Into<Arc<[u8]>>, source: P) -> Result<Self> {
		let metadata = LazyPartitionMetadata::new(metadata)?;
		let parse_options = ParseOptions {
			map_version: metadata.map_version(),
			..ParseOptions::default()
		};
		Ok(Self {
			source,
			metadata,
			parse_options,
			mapper: None,
			pending: IndexSet::new(),
			built: HashSet::new(),
		})
	}

	pub fn with_allow_experimental(mut self, allow_experimental: bool) -> Self {
		self.parse_options.allow_experimental = allow_experimental;
		self
	}

	pub fn source(&self) -> &P {
		&self.source
	}

	pub fn metadata(&self) -> &LazyPartitionMetadata {
		&self.metadata
	}

	/// An empty table carrying the data shared by all partitions.
	fn initial_mapper(&self) -> Result<ClassNameMapper> {
		let mut mapper = ClassNameMapper::new();
		let version = self.metadata.map_version();
		if !version.is_unknown() {
			mapper.add_map_version(MapVersionInfo::new(version));
		}
		if let Some(preamble) = self.metadata.additional_info()?.and_then(|info| info.preamble.clone()) {
			mapper.set_preamble(preamble);
		}
		Ok(mapper)
	}

	#[instrument(skip_all, fields(pending = self.pending.len()))]
	fn load(&mut self, diagnostics: &dyn DiagnosticsHandler) -> Result<Arc<ClassNameMapper>> {
		if let (Some(mapper), true) = (&self.mapper, self.pending.is_empty()) {
			return Ok(Arc::clone(mapper));
		}
		let mut mapper = match self.mapper.take() {
			Some(mapper) => Arc::unwrap_or_clone(mapper),
			None => self.initial_mapper()?,
		};
		let pending: Vec<String> = self.pending.drain(..).collect();
		let mut done = 0;
		let outcome = self.fetch_all(&pending, &mut done, &mut mapper, diagnostics);
		// Keys from the failing one onwards stay pending for the next load.
		let (built, unfinished) = pending.split_at(done);
		self.built.extend(built.iter().cloned());
		self.pending.extend(unfinished.iter().cloned());
		let mapper = Arc::new(mapper);
		self.mapper = Some(Arc::clone(&mapper));
		outcome.map(|()| mapper)
	}

	/// Advances `done` past every key that was loaded or found missing.
	fn fetch_all(
		&mut self,
		keys: &[String],
		done: &mut usize,
		mapper: &mut ClassNameMapper,
		diagnostics: &dyn DiagnosticsHandler,
	) -> Result<()> {
		if keys.is_empty() {
			return Ok(());
		}
		self.source.on_prepare()?;
		let known_keys = self.metadata.partition_keys()?;
		for key in keys {
			if known_keys.is_some_and(|known| !known.contains(key)) {
				trace!(key = %key, "Key has no partition");
				*done += 1;
				continue;
			}
			let Some(payload) = self.source.fetch(key)? else {
				debug!(key = %key, "Partition not available");
				*done += 1;
				continue;
			};
			let mut reader = MapLineReader::stream(payload.as_slice());
			let fragment = ClassNameMapper::from_line_reader(&mut reader, self.parse_options)
				.inspect_err(|error| diagnostics.error(&format!("Invalid partition {key}: {error}")))?;
			debug!(key = %key, classes = fragment.len(), "Loaded partition");
			mapper.combine(fragment);
			*done += 1;
		}
		Ok(())
	}
}

impl<P: PartitionSource> MappingSupplier for PartitionedMappingSupplier<P> {
	fn register_class_use(&mut self, class: &ClassReference) {
		let key = self.metadata.key_for(class);
		if self.built.contains(&key) || self.pending.contains(&key) {
			return;
		}
		// Decoding errors surface from the next load instead.
		if let Ok(Some(known)) = self.metadata.partition_keys() {
			if !known.contains(&key) {
				trace!(key = %key, "Key has no partition");
				self.built.insert(key);
				return;
			}
		}
		self.source.on_interest(&key);
		self.pending.insert(key);
	}

	fn create_retracer(&mut self, diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<Retracer> {
		let mapper = self.load(diagnostics.as_ref())?;
		Ok(Retracer::new(mapper, diagnostics))
	}

	/// The version recorded in the metadata; no partition is fetched.
	fn map_versions(&mut self, _diagnostics: Arc<dyn DiagnosticsHandler>) -> Result<BTreeSet<MapVersionInfo>> {
		let version = self.metadata.map_version();
		Ok(if version.is_unknown() {
			BTreeSet::new()
		} else {
			BTreeSet::from([MapVersionInfo::new(version)])
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::retracer::RetraceStackTraceContext;
	use loom_retrace_core::{CollectingDiagnostics, MapVersion, MethodReference};
	use loom_retrace_partition::{MappingPartitioner, PartitionStrategy};

	const MAPPING: &str = "\
# {\"id\":\"com.android.tools.r8.mapping\",\"version\":\"2.0\"}
com.example.Foo -> a.a:
    10:10:void bar() -> b
com.example.Bar -> a.b:
    20:20:void qux() -> c
";

	fn supplier(strategy: PartitionStrategy) -> PartitionedMappingSupplier<InMemoryPartitions> {
		let mut partitions = Vec::new();
		let metadata = MappingPartitioner::new(strategy)
			.partition_str(MAPPING, |partition| {
				partitions.push(partition);
				Ok(())
			})
			.unwrap();
		PartitionedMappingSupplier::new(metadata.serialize(), partitions.into_iter().collect()).unwrap()
	}

	fn diagnostics() -> Arc<dyn DiagnosticsHandler> {
		Arc::new(CollectingDiagnostics::new())
	}

	#[test]
	fn test_keys_are_fetched_once() {
		let mut supplier = supplier(PartitionStrategy::ObfuscatedTypeName);
		let class = ClassReference::from_type_name("a.a");
		supplier.register_class_use(&class);
		supplier.register_class_use(&class);
		supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().fetched(), ["a.a"]);
		assert_eq!(supplier.source().interests(), ["a.a"]);

		supplier.register_class_use(&class);
		supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().fetched(), ["a.a"]);
		assert_eq!(supplier.source().prepared(), 1);
	}

	#[test]
	fn test_fetch_follows_registration_order() {
		let mut supplier = supplier(PartitionStrategy::ObfuscatedTypeName);
		supplier.register_class_use(&ClassReference::from_type_name("a.b"));
		supplier.register_method_use(&MethodReference::new(ClassReference::from_type_name("a.a"), "b", vec![], None));
		let retracer = supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().fetched(), ["a.b", "a.a"]);

		let method = MethodReference::new(ClassReference::from_type_name("a.a"), "b", vec![], None);
		let frames = retracer.retrace_frame(&RetraceStackTraceContext::empty(), Some(10), &method);
		assert_eq!(frames.elements()[0].top_frame().method_name(), "bar");
	}

	#[test]
	fn test_missing_partition_is_unknown() {
		let mut supplier = supplier(PartitionStrategy::ObfuscatedTypeName);
		let missing = ClassReference::from_type_name("z.z");
		supplier.register_class_use(&missing);
		let retracer = supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().fetched(), ["z.z"]);
		assert!(retracer.retrace_class(&missing).elements()[0].is_unknown());
	}

	#[test]
	fn test_named_partitions_skip_unknown_keys() {
		let mut supplier = supplier(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames);
		supplier.register_class_use(&ClassReference::from_type_name("z.z"));
		supplier.register_class_use(&ClassReference::from_type_name("a.b"));
		let retracer = supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().fetched(), ["a.b"]);
		assert_eq!(supplier.source().interests(), ["a.b"]);
		assert_eq!(retracer.mapper().map_version(), MapVersion::V2_0);
	}

	/// Fails `on_prepare` or the fetch of one key a set number of times.
	#[derive(Default)]
	struct FlakyPartitions {
		inner: InMemoryPartitions,
		prepare_failures: usize,
		failing_key: Option<(String, usize)>,
	}

	impl PartitionSource for FlakyPartitions {
		fn fetch(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
			if let Some((failing, remaining)) = &mut self.failing_key {
				if failing.as_str() == key && *remaining > 0 {
					*remaining -= 1;
					return Err(std::io::Error::other("connection reset").into());
				}
			}
			self.inner.fetch(key)
		}

		fn on_prepare(&mut self) -> Result<()> {
			if self.prepare_failures > 0 {
				self.prepare_failures -= 1;
				return Err(std::io::Error::other("storage offline").into());
			}
			self.inner.on_prepare()
		}
	}

	fn flaky(prepare_failures: usize, failing_key: Option<(&str, usize)>) -> PartitionedMappingSupplier<FlakyPartitions> {
		let mut inner = InMemoryPartitions::new();
		let metadata = MappingPartitioner::new(PartitionStrategy::ObfuscatedTypeName)
			.partition_str(MAPPING, |partition| {
				inner.insert(partition);
				Ok(())
			})
			.unwrap();
		let source = FlakyPartitions {
			inner,
			prepare_failures,
			failing_key: failing_key.map(|(key, count)| (key.to_string(), count)),
		};
		PartitionedMappingSupplier::new(metadata.serialize(), source).unwrap()
	}

	#[test]
	fn test_failed_prepare_keeps_keys_pending() {
		let mut supplier = flaky(1, None);
		let class = ClassReference::from_type_name("a.a");
		supplier.register_class_use(&class);
		assert!(supplier.create_retracer(diagnostics()).is_err());
		assert!(supplier.source().inner.fetched().is_empty());

		supplier.register_class_use(&class);
		let retracer = supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().inner.fetched(), ["a.a"]);
		assert!(!retracer.retrace_class(&class).elements()[0].is_unknown());
	}

	#[test]
	fn test_failed_fetch_retries_remaining_keys() {
		let mut supplier = flaky(0, Some(("a.b", 1)));
		supplier.register_class_use(&ClassReference::from_type_name("a.a"));
		supplier.register_class_use(&ClassReference::from_type_name("a.b"));
		supplier.register_class_use(&ClassReference::from_type_name("z.z"));
		assert!(supplier.create_retracer(diagnostics()).is_err());
		assert_eq!(supplier.source().inner.fetched(), ["a.a"]);

		let retracer = supplier.create_retracer(diagnostics()).unwrap();
		assert_eq!(supplier.source().inner.fetched(), ["a.a", "a.b", "z.z"]);
		for name in ["a.a", "a.b"] {
			let class = ClassReference::from_type_name(name);
			assert!(!retracer.retrace_class(&class).elements()[0].is_unknown());
		}
	}

	#[test]
	fn test_map_versions_come_from_metadata() {
		let mut supplier = supplier(PartitionStrategy::ObfuscatedTypeName);
		let versions = supplier.map_versions(diagnostics()).unwrap();
		assert_eq!(versions.into_iter().map(|info| info.version).collect::<Vec<_>>(), vec![MapVersion::V2_0]);
		assert!(supplier.source().fetched().is_empty());
	}
}
