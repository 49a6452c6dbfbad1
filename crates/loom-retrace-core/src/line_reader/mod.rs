// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Line readers over mapping files.
//!
//! Both readers share one assembly loop. A [`ChunkSource`] performs physical
//! reads and reports, for each read, the bytes of the current line it found
//! and whether the read ran out of buffer before a `\n`. Fragments of a line
//! that straddles buffers or mapped windows are concatenated until a read
//! finds the terminator.

mod filter;
mod mapped;
mod stream;

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub use mapped::MappedChunks;
pub use stream::StreamChunks;

use filter::{obfuscated_class_name, LineKind};

/// Default size of the physical read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Whether `line` is a class header (`original -> obfuscated:`).
pub fn is_class_header(line: &str) -> bool {
	filter::classify(line.as_bytes()) == LineKind::ClassMapping
}

/// Produces logical lines, without their terminators.
pub trait LineReader {
	/// Returns the next line, or `None` at end of input.
	fn read_line(&mut self) -> io::Result<Option<String>>;

	/// Releases the underlying resources. Further reads return `None`.
	fn close(&mut self) -> io::Result<()> {
		Ok(())
	}
}

/// A source of physical reads.
pub trait ChunkSource {
	/// Performs one physical read. Returns `false` at end of input.
	fn advance(&mut self) -> io::Result<bool>;

	/// Bytes of the current line found by the last read, without `\n`.
	fn fragment(&self) -> &[u8];

	/// Whether the last read ended without finding a line terminator.
	fn exceeds_buffer(&self) -> bool;

	/// Drops buffers, mappings and handles.
	fn release(&mut self);
}

/// Restricts which mapping lines a reader yields.
#[derive(Debug, Clone)]
struct ClassFilter {
	classes: HashSet<String>,
	read_preamble_and_source_files: bool,
	inside_class_of_interest: bool,
	seen_first_class: bool,
	after_class_header: bool,
}

/// Line reader over a chunk source, optionally filtered to a set of
/// obfuscated class names.
pub struct MapLineReader<S> {
	source: S,
	filter: Option<ClassFilter>,
	closed: bool,
}

impl MapLineReader<MappedChunks> {
	/// Memory-maps `path` with the default window and page sizes.
	pub fn mapped(path: impl AsRef<Path>) -> io::Result<Self> {
		Ok(Self::new(MappedChunks::open(path)?))
	}
}

impl<R: Read> MapLineReader<StreamChunks<R>> {
	pub fn stream(reader: R) -> Self {
		Self::new(StreamChunks::new(reader))
	}

	pub fn stream_with_capacity(reader: R, buffer_size: usize) -> Self {
		Self::new(StreamChunks::with_capacity(reader, buffer_size))
	}
}

impl MapLineReader<StreamChunks<File>> {
	pub fn open(path: impl AsRef<Path>, buffer_size: usize) -> io::Result<Self> {
		Ok(Self::stream_with_capacity(File::open(path)?, buffer_size))
	}
}

impl<S: ChunkSource> MapLineReader<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			filter: None,
			closed: false,
		}
	}

	/// Only yield lines of classes whose obfuscated name is in `classes`.
	///
	/// With `read_preamble_and_source_files`, the preamble, every class
	/// header and the `sourceFile` comment directly after it are yielded too.
	pub fn with_class_filter(mut self, classes: HashSet<String>, read_preamble_and_source_files: bool) -> Self {
		self.filter = Some(ClassFilter {
			classes,
			read_preamble_and_source_files,
			inside_class_of_interest: false,
			seen_first_class: false,
			after_class_header: false,
		});
		self
	}

	/// Assembles the next logical line from one or more physical reads.
	fn next_line_bytes(&mut self) -> io::Result<Option<Vec<u8>>> {
		let mut line: Option<Vec<u8>> = None;
		loop {
			if !self.source.advance()? {
				return Ok(line);
			}
			match line.as_mut() {
				Some(accumulated) => accumulated.extend_from_slice(self.source.fragment()),
				None => line = Some(self.source.fragment().to_vec()),
			}
			if !self.source.exceeds_buffer() {
				if let Some(bytes) = line.as_mut() {
					if bytes.last() == Some(&b'\r') {
						bytes.pop();
					}
				}
				return Ok(line);
			}
		}
	}
}

impl ClassFilter {
	fn accept(&mut self, line: &[u8]) -> bool {
		let kind = filter::classify(line);
		let after_class_header = std::mem::replace(&mut self.after_class_header, false);
		match kind {
			LineKind::ClassMapping => {
				self.seen_first_class = true;
				self.after_class_header = true;
				self.inside_class_of_interest = obfuscated_class_name(line)
					.and_then(|name| std::str::from_utf8(name).ok())
					.is_some_and(|name| self.classes.contains(name));
				self.inside_class_of_interest || self.read_preamble_and_source_files
			}
			_ if self.inside_class_of_interest => true,
			_ if !self.seen_first_class => self.read_preamble_and_source_files,
			LineKind::SourceFile => after_class_header && self.read_preamble_and_source_files,
			LineKind::Other => false,
		}
	}
}

impl<S: ChunkSource> LineReader for MapLineReader<S> {
	fn read_line(&mut self) -> io::Result<Option<String>> {
		if self.closed {
			return Ok(None);
		}
		loop {
			let Some(bytes) = self.next_line_bytes()? else {
				return Ok(None);
			};
			if let Some(filter) = self.filter.as_mut() {
				if !filter.accept(&bytes) {
					continue;
				}
			}
			return String::from_utf8(bytes)
				.map(Some)
				.map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error));
		}
	}

	fn close(&mut self) -> io::Result<()> {
		self.closed = true;
		self.source.release();
		Ok(())
	}
}
