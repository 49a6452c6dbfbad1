// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use tracing::trace;

use super::{ChunkSource, DEFAULT_BUFFER_SIZE};

/// Largest region mapped at once.
pub const DEFAULT_WINDOW_SIZE: u64 = 1 << 30;

/// Physical reads from a memory-mapped file.
///
/// The file is mapped in windows of at most `window_size` bytes; each read
/// copies up to `page_size` bytes of the current line into a page buffer,
/// remapping the next window when the cursor passes the end of the current
/// one.
pub struct MappedChunks {
	file: Option<File>,
	file_len: u64,
	window_size: u64,
	window: Option<Mmap>,
	window_offset: u64,
	window_cursor: usize,
	page: Vec<u8>,
	page_size: usize,
	exceeds_buffer: bool,
}

impl MappedChunks {
	pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
		Self::open_with(path, DEFAULT_WINDOW_SIZE, DEFAULT_BUFFER_SIZE)
	}

	/// Zero sizes are raised to one byte.
	pub fn open_with(path: impl AsRef<Path>, window_size: u64, page_size: usize) -> io::Result<Self> {
		let file = File::open(path)?;
		let file_len = file.metadata()?.len();
		Ok(Self {
			file: Some(file),
			file_len,
			window_size: window_size.max(1),
			window: None,
			window_offset: 0,
			window_cursor: 0,
			page: Vec::with_capacity(page_size.max(1)),
			page_size: page_size.max(1),
			exceeds_buffer: false,
		})
	}

	/// Makes sure a window with unread bytes is mapped. Returns `false`
	/// once the whole file has been consumed.
	fn ensure_window(&mut self) -> io::Result<bool> {
		let window_len = self.window.as_ref().map_or(0, |window| window.len());
		if self.window.is_some() && self.window_cursor < window_len {
			return Ok(true);
		}
		let next_offset = if self.window.is_some() {
			self.window_offset + window_len as u64
		} else {
			self.window_offset
		};
		self.window = None;
		if next_offset >= self.file_len {
			self.window_offset = next_offset;
			return Ok(false);
		}
		let Some(file) = self.file.as_ref() else {
			return Ok(false);
		};
		let len = (self.file_len - next_offset).min(self.window_size);
		let len = usize::try_from(len).map_err(|_| io::Error::other("mapping window exceeds address space"))?;
		trace!(offset = next_offset, len, "Mapping window");
		// SAFETY: the mapping is read-only and owned by this reader; callers
		// must not truncate the file while it is being read.
		let window = unsafe { MmapOptions::new().offset(next_offset).len(len).map(file)? };
		self.window = Some(window);
		self.window_offset = next_offset;
		self.window_cursor = 0;
		Ok(true)
	}
}

impl ChunkSource for MappedChunks {
	fn advance(&mut self) -> io::Result<bool> {
		self.page.clear();
		loop {
			if !self.ensure_window()? {
				if self.page.is_empty() {
					return Ok(false);
				}
				self.exceeds_buffer = true;
				return Ok(true);
			}
			let Some(window) = self.window.as_ref() else {
				return Ok(false);
			};
			let room = self.page_size - self.page.len();
			let available = &window[self.window_cursor..];
			let scan = &available[..available.len().min(room)];
			if let Some(offset) = scan.iter().position(|&byte| byte == b'\n') {
				self.page.extend_from_slice(&scan[..offset]);
				self.window_cursor += offset + 1;
				self.exceeds_buffer = false;
				return Ok(true);
			}
			self.page.extend_from_slice(scan);
			self.window_cursor += scan.len();
			if self.page.len() == self.page_size {
				self.exceeds_buffer = true;
				return Ok(true);
			}
		}
	}

	fn fragment(&self) -> &[u8] {
		&self.page
	}

	fn exceeds_buffer(&self) -> bool {
		self.exceeds_buffer
	}

	fn release(&mut self) {
		self.window = None;
		self.file = None;
		self.page = Vec::new();
		self.window_offset = self.file_len;
	}
}
