// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io::{self, Read};

use super::{ChunkSource, DEFAULT_BUFFER_SIZE};

/// Physical reads from any [`Read`] into one fixed-size buffer.
pub struct StreamChunks<R> {
	inner: Option<R>,
	buffer: Box<[u8]>,
	read_end: usize,
	cursor: usize,
	start: usize,
	end: usize,
	exceeds_buffer: bool,
}

impl<R: Read> StreamChunks<R> {
	pub fn new(inner: R) -> Self {
		Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
	}

	/// A zero capacity is raised to one byte.
	pub fn with_capacity(inner: R, capacity: usize) -> Self {
		Self {
			inner: Some(inner),
			buffer: vec![0; capacity.max(1)].into_boxed_slice(),
			read_end: 0,
			cursor: 0,
			start: 0,
			end: 0,
			exceeds_buffer: false,
		}
	}

	fn fill(&mut self) -> io::Result<usize> {
		let Some(inner) = self.inner.as_mut() else {
			return Ok(0);
		};
		loop {
			match inner.read(&mut self.buffer) {
				Ok(read) => return Ok(read),
				Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
				Err(error) => return Err(error),
			}
		}
	}
}

impl<R: Read> ChunkSource for StreamChunks<R> {
	fn advance(&mut self) -> io::Result<bool> {
		if self.cursor >= self.read_end {
			let read = self.fill()?;
			if read == 0 {
				return Ok(false);
			}
			self.cursor = 0;
			self.read_end = read;
		}
		self.start = self.cursor;
		match self.buffer[self.cursor..self.read_end]
			.iter()
			.position(|&byte| byte == b'\n')
		{
			Some(offset) => {
				self.end = self.cursor + offset;
				self.cursor = self.end + 1;
				self.exceeds_buffer = false;
			}
			None => {
				self.end = self.read_end;
				self.cursor = self.read_end;
				self.exceeds_buffer = true;
			}
		}
		Ok(true)
	}

	fn fragment(&self) -> &[u8] {
		&self.buffer[self.start..self.end]
	}

	fn exceeds_buffer(&self) -> bool {
		self.exceeds_buffer
	}

	fn release(&mut self) {
		self.inner = None;
		self.buffer = Box::default();
		self.read_end = 0;
		self.cursor = 0;
		self.start = 0;
		self.end = 0;
	}
}
