// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Byte-level recognition of class headers and `sourceFile` comments.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
	ClassMapping,
	SourceFile,
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Beginning,
	BeginningNoWhitespace,
	SeenOriginalClass,
	SeenArrow,
	SeenObfuscatedClass,
	ClassMapping,
	Comment,
	SourceFile,
	Other,
}

struct Cursor<'a> {
	bytes: &'a [u8],
	index: usize,
}

impl<'a> Cursor<'a> {
	fn peek(&self) -> Option<u8> {
		self.bytes.get(self.index).copied()
	}

	fn read(&mut self, expected: u8) -> bool {
		if self.peek() == Some(expected) {
			self.index += 1;
			true
		} else {
			false
		}
	}

	fn skip_spaces(&mut self) {
		while matches!(self.peek(), Some(b' ' | b'\t')) {
			self.index += 1;
		}
	}

	/// Consumes non-whitespace bytes up to, not including, `stop`.
	fn read_name_until(&mut self, stop: u8) -> bool {
		let begin = self.index;
		while let Some(byte) = self.peek() {
			if byte == stop {
				return self.index > begin;
			}
			if byte.is_ascii_whitespace() {
				return false;
			}
			self.index += 1;
		}
		false
	}

	fn rest(&self) -> &'a [u8] {
		&self.bytes[self.index.min(self.bytes.len())..]
	}
}

fn step(state: State, cursor: &mut Cursor<'_>) -> State {
	match state {
		State::Beginning => match cursor.peek() {
			Some(b'#') => {
				cursor.index += 1;
				State::Comment
			}
			Some(byte) if !byte.is_ascii_whitespace() => State::BeginningNoWhitespace,
			_ => State::Other,
		},
		State::BeginningNoWhitespace => {
			if cursor.read_name_until(b' ') {
				State::SeenOriginalClass
			} else {
				State::Other
			}
		}
		State::SeenOriginalClass => {
			cursor.skip_spaces();
			if cursor.read(b'-') && cursor.read(b'>') {
				State::SeenArrow
			} else {
				State::Other
			}
		}
		State::SeenArrow => {
			cursor.skip_spaces();
			if cursor.read_name_until(b':') {
				State::SeenObfuscatedClass
			} else {
				State::Other
			}
		}
		State::SeenObfuscatedClass => {
			if !cursor.read(b':') {
				return State::Other;
			}
			cursor.skip_spaces();
			match cursor.peek() {
				None | Some(b'#') | Some(b'\r') => State::ClassMapping,
				_ => State::Other,
			}
		}
		State::Comment => {
			cursor.skip_spaces();
			let rest = cursor.rest();
			let is_source_file = rest.first() == Some(&b'{')
				&& rest
					.windows(b"\"sourceFile\"".len())
					.any(|window| window == b"\"sourceFile\"");
			if is_source_file {
				State::SourceFile
			} else {
				State::Other
			}
		}
		terminal => terminal,
	}
}

pub(crate) fn classify(line: &[u8]) -> LineKind {
	let mut cursor = Cursor { bytes: line, index: 0 };
	let mut state = State::Beginning;
	loop {
		match state {
			State::ClassMapping => return LineKind::ClassMapping,
			State::SourceFile => return LineKind::SourceFile,
			State::Other => return LineKind::Other,
			_ => state = step(state, &mut cursor),
		}
	}
}

/// The obfuscated name in a class header `original -> obfuscated:`.
pub(crate) fn obfuscated_class_name(line: &[u8]) -> Option<&[u8]> {
	let arrow = line.windows(2).position(|window| window == b"->")?;
	let rest = &line[arrow + 2..];
	let begin = rest.iter().position(|byte| !byte.is_ascii_whitespace())?;
	let rest = &rest[begin..];
	let end = rest.iter().position(|&byte| byte == b':')?;
	Some(&rest[..end])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_class_headers() {
		assert_eq!(classify(b"com.Foo -> a:"), LineKind::ClassMapping);
		assert_eq!(classify(b"com.Foo -> a: # trailing"), LineKind::ClassMapping);
		assert_eq!(classify(b"com.Foo -> a"), LineKind::Other);
		assert_eq!(classify(b"com.Foo a:"), LineKind::Other);
		assert_eq!(classify(b"com.Foo ->"), LineKind::Other);
		assert_eq!(classify(b"com.Foo"), LineKind::Other);
	}

	#[test]
	fn test_members_and_comments() {
		assert_eq!(classify(b"    int a -> b"), LineKind::Other);
		assert_eq!(classify(b""), LineKind::Other);
		assert_eq!(classify(b"# plain"), LineKind::Other);
		assert_eq!(
			classify(b"# {\"id\":\"sourceFile\",\"fileName\":\"Foo.java\"}"),
			LineKind::SourceFile
		);
	}

	#[test]
	fn test_obfuscated_class_name() {
		assert_eq!(obfuscated_class_name(b"com.Foo -> a.b:"), Some(&b"a.b"[..]));
		assert_eq!(obfuscated_class_name(b"com.Foo a.b"), None);
	}
}
