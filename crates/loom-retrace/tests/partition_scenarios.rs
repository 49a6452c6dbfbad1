// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use loom_retrace::{
	EagerMappingSupplier, InMemoryPartitions, MappingSource, MappingSupplier, PartitionedMappingSupplier,
	RetraceStackTraceContext, StackTraceLineParser, StackTraceRetracer,
};
use loom_retrace_core::{ClassReference, MapVersion};
use loom_retrace_partition::{MappingPartitioner, PartitionStrategy};

const MAPPING: &str = r#"# compiler: R8
# {"id":"com.android.tools.r8.mapping","version":"2.0"}
com.example.Main -> a:
    1:1:void main(java.lang.String[]):12:12 -> main
com.example.Service -> b:
# {"id":"sourceFile","fileName":"ServiceImpl.kt"}
    1:3:void start():20:22 -> a
    4:4:void com.example.Helper.log():8:8 -> a
    4:4:void stop():30 -> a
com.example.Unused -> c:
    void idle() -> a
"#;

const TRACE: &str = "\
java.lang.IllegalStateException: Service is gone
\tat b.a(SourceFile:4)
\tat b.a(SourceFile:2)
\tat a.main(SourceFile:1)";

fn partitioned(strategy: PartitionStrategy) -> PartitionedMappingSupplier<InMemoryPartitions> {
	let mut partitions = InMemoryPartitions::new();
	let metadata = MappingPartitioner::new(strategy)
		.partition_str(MAPPING, |partition| {
			partitions.insert(partition);
			Ok(())
		})
		.unwrap();
	PartitionedMappingSupplier::new(metadata.serialize(), partitions).unwrap()
}

fn retrace<S: MappingSupplier>(supplier: S) -> (Vec<String>, S) {
	let mut retracer = StackTraceRetracer::new(supplier, StackTraceLineParser::compile(None).unwrap());
	let lines = retracer
		.retrace_str(TRACE, &RetraceStackTraceContext::empty())
		.unwrap()
		.render();
	(lines, retracer.into_supplier())
}

#[test]
fn test_partitioned_and_eager_retrace_agree() {
	let expected = vec![
		"java.lang.IllegalStateException: Service is gone",
		"\tat com.example.Helper.log(Helper.java:8)",
		"\tat com.example.Service.stop(ServiceImpl.kt:30)",
		"\tat com.example.Service.start(ServiceImpl.kt:21)",
		"\tat com.example.Main.main(Main.java:12)",
	];
	let (eager, _) = retrace(EagerMappingSupplier::new(MappingSource::bytes(MAPPING.as_bytes())));
	assert_eq!(eager, expected);

	for strategy in [
		PartitionStrategy::ObfuscatedTypeName,
		PartitionStrategy::ObfuscatedTypeNameWithPartitionNames,
	] {
		let (lines, supplier) = retrace(partitioned(strategy));
		assert_eq!(lines, expected, "strategy {strategy:?}");
		assert!(!supplier.source().fetched().iter().any(|key| key == "c"));
	}
}

#[test]
fn test_partitions_are_fetched_once_per_supplier() {
	let mut retracer = StackTraceRetracer::new(
		partitioned(PartitionStrategy::ObfuscatedTypeName),
		StackTraceLineParser::compile(None).unwrap(),
	);
	for _ in 0..3 {
		retracer
			.retrace_str(TRACE, &RetraceStackTraceContext::empty())
			.unwrap();
	}
	let mut fetched = retracer.supplier().source().fetched().to_vec();
	fetched.sort();
	fetched.dedup();
	assert_eq!(fetched.len(), retracer.supplier().source().fetched().len());
	assert_eq!(retracer.supplier().source().prepared(), 1);
}

#[test]
fn test_missing_partition_leaves_lines_untouched() {
	let mut supplier = partitioned(PartitionStrategy::ObfuscatedTypeName);
	supplier.register_class_use(&ClassReference::from_type_name("zz"));
	let mut retracer = StackTraceRetracer::new(supplier, StackTraceLineParser::compile(None).unwrap());
	let lines = retracer
		.retrace_str("\tat zz.a(SourceFile:3)", &RetraceStackTraceContext::empty())
		.unwrap()
		.render();
	assert_eq!(lines, vec!["\tat zz.a(SourceFile:3)"]);
	assert_eq!(retracer.supplier().source().fetched(), ["zz".to_string()]);
}

#[test]
fn test_named_partitions_never_fetch_unknown_keys() {
	let mut retracer = StackTraceRetracer::new(
		partitioned(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames),
		StackTraceLineParser::compile(None).unwrap(),
	);
	retracer
		.retrace_str("\tat zz.a(SourceFile:3)\n\tat a.main(SourceFile:1)", &RetraceStackTraceContext::empty())
		.unwrap();
	assert_eq!(retracer.supplier().source().fetched(), ["a".to_string()]);
	assert_eq!(retracer.supplier().source().interests(), ["a".to_string()]);
}

#[test]
fn test_preamble_and_version_survive_partitioning() {
	let mut supplier = partitioned(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames);
	assert_eq!(supplier.metadata().map_version(), MapVersion::V2_0);
	let retracer = supplier
		.create_retracer(std::sync::Arc::new(loom_retrace_core::TracingDiagnostics))
		.unwrap();
	let preamble = retracer.mapper().preamble();
	assert_eq!(preamble.len(), 2);
	assert_eq!(preamble[0], "# compiler: R8");
	assert!(supplier.source().fetched().is_empty());
}
