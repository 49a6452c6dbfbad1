// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Big-endian framing primitives shared by the eager and lazy decoders.

use bytes::{Buf, BufMut};

use crate::error::{PartitionError, Result};

/// A bounds-checked cursor over encoded metadata.
pub(crate) struct ByteReader<'a> {
	buf: &'a [u8],
	position: usize,
}

impl<'a> ByteReader<'a> {
	pub(crate) fn new(buf: &'a [u8]) -> Self {
		Self { buf, position: 0 }
	}

	pub(crate) fn at(buf: &'a [u8], position: usize) -> Self {
		Self {
			buf: &buf[position.min(buf.len())..],
			position,
		}
	}

	/// Offset from the start of the original buffer.
	pub(crate) fn position(&self) -> usize {
		self.position
	}

	pub(crate) fn remaining(&self) -> usize {
		self.buf.remaining()
	}

	fn require(&self, len: usize, what: &str) -> Result<()> {
		if self.buf.remaining() < len {
			return Err(PartitionError::malformed(format!(
				"truncated {what} at offset {}: need {len} bytes, have {}",
				self.position,
				self.buf.remaining()
			)));
		}
		Ok(())
	}

	pub(crate) fn read_u16(&mut self, what: &str) -> Result<u16> {
		self.require(2, what)?;
		self.position += 2;
		Ok(self.buf.get_u16())
	}

	pub(crate) fn read_i16(&mut self, what: &str) -> Result<i16> {
		self.require(2, what)?;
		self.position += 2;
		Ok(self.buf.get_i16())
	}

	pub(crate) fn read_i32(&mut self, what: &str) -> Result<i32> {
		self.require(4, what)?;
		self.position += 4;
		Ok(self.buf.get_i32())
	}

	/// Reads an `i32` length and validates it against the remaining bytes.
	pub(crate) fn read_len(&mut self, what: &str) -> Result<usize> {
		let len = self.read_i32(what)?;
		let len = usize::try_from(len)
			.map_err(|_| PartitionError::malformed(format!("negative length {len} for {what}")))?;
		self.require(len, what)?;
		Ok(len)
	}

	pub(crate) fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
		self.require(len, what)?;
		let (head, tail) = self.buf.split_at(len);
		self.buf = tail;
		self.position += len;
		Ok(head)
	}

	/// Reads an `i32`-length-prefixed UTF-8 string.
	pub(crate) fn read_string(&mut self, what: &str) -> Result<&'a str> {
		let len = self.read_len(what)?;
		let bytes = self.read_bytes(len, what)?;
		Ok(std::str::from_utf8(bytes)?)
	}

	/// Skips an `i32`-length-prefixed block and returns its payload range.
	pub(crate) fn skip_block(&mut self, what: &str) -> Result<(usize, usize)> {
		let len = self.read_len(what)?;
		let start = self.position;
		self.read_bytes(len, what)?;
		Ok((start, start + len))
	}

	pub(crate) fn rest(&mut self) -> &'a [u8] {
		let rest = self.buf;
		self.position += rest.len();
		self.buf = &[];
		rest
	}
}

pub(crate) fn put_string(out: &mut Vec<u8>, value: &str) {
	put_block(out, value.as_bytes());
}

pub(crate) fn put_block(out: &mut Vec<u8>, payload: &[u8]) {
	out.put_i32(payload.len() as i32);
	out.put_slice(payload);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_string_round_trip_and_positions() {
		let mut out = Vec::new();
		out.put_u16(7);
		put_string(&mut out, "héllo");
		let mut reader = ByteReader::new(&out);
		assert_eq!(reader.read_u16("tag").unwrap(), 7);
		assert_eq!(reader.read_string("text").unwrap(), "héllo");
		assert_eq!(reader.position(), out.len());
		assert_eq!(reader.remaining(), 0);
	}

	#[test]
	fn test_truncated_input_is_malformed() {
		let mut out = Vec::new();
		out.put_i32(10);
		out.put_slice(b"abc");
		let mut reader = ByteReader::new(&out);
		assert!(matches!(reader.read_string("text"), Err(PartitionError::Malformed(_))));
	}

	#[test]
	fn test_negative_length_is_malformed() {
		let mut out = Vec::new();
		out.put_i32(-1);
		let mut reader = ByteReader::new(&out);
		assert!(matches!(reader.read_len("block"), Err(PartitionError::Malformed(_))));
	}

	#[test]
	fn test_reader_at_offset() {
		let bytes = [0u8, 0, 0, 1, 0xAB];
		let mut reader = ByteReader::at(&bytes, 2);
		assert_eq!(reader.read_u16("tag").unwrap(), 1);
		assert_eq!(reader.position(), 4);
		assert_eq!(reader.rest(), &[0xAB]);
	}
}
