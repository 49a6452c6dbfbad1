// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partitioned mapping storage for Loom retrace.
//!
//! A large mapping is split into one partition per obfuscated class so that
//! a retrace session only needs to fetch the classes a stack trace mentions.
//! The [`PartitionMetadata`] record describes how keys are derived and
//! carries data shared by all partitions, such as the mapping preamble.
//!
//! # Example
//!
//! ```
//! use loom_retrace_partition::{MappingPartitioner, PartitionMetadata, PartitionStrategy};
//!
//! let mut partitions = Vec::new();
//! let metadata = MappingPartitioner::new(PartitionStrategy::ObfuscatedTypeNameWithPartitionNames)
//!     .partition_str("com.example.Foo -> a.a:\n    void bar() -> b\n", |partition| {
//!         partitions.push(partition);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(partitions[0].key, "a.a");
//! let bytes = metadata.serialize();
//! assert_eq!(PartitionMetadata::deserialize(&bytes).unwrap(), metadata);
//! ```

mod codec;
pub mod error;
pub mod lazy;
pub mod metadata;
pub mod partitioner;

pub use error::{PartitionError, Result};
pub use lazy::LazyPartitionMetadata;
pub use metadata::{AdditionalInfo, PartitionMetadata, PartitionStrategy};
pub use partitioner::{MappingPartition, MappingPartitioner};
