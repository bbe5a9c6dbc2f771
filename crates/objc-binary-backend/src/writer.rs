// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Little-endian byte emission.

/// Append-only output buffer. All multi-byte integers are little-endian;
/// strings are NUL-free and carry a trailing terminator.
#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        assert!(
            !value.as_bytes().contains(&0),
            "BUG: embedded NUL in string `{}`",
            value
        );
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
