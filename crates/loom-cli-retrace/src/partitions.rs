// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk partition layout: `<dir>/metadata` plus one file per key under
//! `<dir>/partitions/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use loom_retrace::{PartitionSource, Result};
use loom_retrace_partition::MappingPartition;
use tracing::debug;

const METADATA_FILE: &str = "metadata";
const PARTITIONS_DIR: &str = "partitions";

/// Partitions stored in a directory written by `loom-retrace partition`.
#[derive(Debug, Clone)]
pub struct DirectoryPartitions {
	root: PathBuf,
}

impl DirectoryPartitions {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Creates the directory layout, keeping existing partitions.
	pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
		let partitions = Self::new(root);
		fs::create_dir_all(partitions.root.join(PARTITIONS_DIR))?;
		Ok(partitions)
	}

	pub fn read_metadata(&self) -> io::Result<Vec<u8>> {
		fs::read(self.root.join(METADATA_FILE))
	}

	pub fn write_metadata(&self, metadata: &[u8]) -> io::Result<()> {
		fs::write(self.root.join(METADATA_FILE), metadata)
	}

	pub fn write_partition(&self, partition: &MappingPartition) -> io::Result<()> {
		let path = self.partition_path(&partition.key).ok_or_else(|| {
			io::Error::new(
				io::ErrorKind::InvalidInput,
				format!("partition key {} is not a valid file name", partition.key),
			)
		})?;
		fs::write(path, &partition.payload)
	}

	/// `None` for keys that would escape the partitions directory.
	fn partition_path(&self, key: &str) -> Option<PathBuf> {
		let valid = !key.is_empty() && key != "." && key != ".." && !key.contains(['/', '\\']);
		valid.then(|| self.root.join(PARTITIONS_DIR).join(key))
	}

	pub fn root(&self) -> &Path {
		&self.root
	}
}

impl PartitionSource for DirectoryPartitions {
	fn fetch(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
		let Some(path) = self.partition_path(key) else {
			debug!(key, "Ignoring key that is not a file name");
			return Ok(None);
		};
		match fs::read(&path) {
			Ok(payload) => Ok(Some(payload)),
			Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
			Err(error) => Err(error.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_written_partitions_can_be_fetched() {
		let dir = tempfile::tempdir().unwrap();
		let partitions = DirectoryPartitions::create(dir.path()).unwrap();
		partitions
			.write_partition(&MappingPartition {
				key: "a.b".into(),
				payload: b"com.Foo -> a.b:\n".to_vec(),
			})
			.unwrap();
		partitions.write_metadata(&[0, 1]).unwrap();

		let mut source = DirectoryPartitions::new(dir.path());
		assert_eq!(source.fetch("a.b").unwrap(), Some(b"com.Foo -> a.b:\n".to_vec()));
		assert_eq!(source.fetch("a.c").unwrap(), None);
		assert_eq!(source.read_metadata().unwrap(), vec![0, 1]);
	}

	#[test]
	fn test_keys_cannot_escape_the_directory() {
		let dir = tempfile::tempdir().unwrap();
		let mut source = DirectoryPartitions::create(dir.path()).unwrap();
		assert_eq!(source.fetch("..").unwrap(), None);
		assert_eq!(source.fetch("../metadata").unwrap(), None);
		assert!(source
			.write_partition(&MappingPartition {
				key: "a/b".into(),
				payload: Vec::new(),
			})
			.is_err());
	}
}
