//! Strict protobuf field reader and writer.
//!
//! The reader understands every wire type the device emits (varint, fixed64,
//! length-delimited, fixed32) and fails on anything else. For the lenient
//! scan used on un-schematized payloads see [`crate::raw`].

use crate::error::{Result, WireError};
use crate::varint::{read_varint, write_varint};

pub const WIRE_VARINT: u8 = 0;
pub const WIRE_FIXED64: u8 = 1;
pub const WIRE_LEN: u8 = 2;
pub const WIRE_FIXED32: u8 = 5;

/// A single field value as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64([u8; 8]),
    Bytes(&'a [u8]),
    Fixed32([u8; 4]),
}

impl WireValue<'_> {
    pub fn wire_type(&self) -> u8 {
        match self {
            WireValue::Varint(_) => WIRE_VARINT,
            WireValue::Fixed64(_) => WIRE_FIXED64,
            WireValue::Bytes(_) => WIRE_LEN,
            WireValue::Fixed32(_) => WIRE_FIXED32,
        }
    }
}

/// Iterates `(field_number, value)` pairs over a protobuf-encoded buffer.
///
/// Yields `Err` once on malformed input and then stops.
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, failed: false }
    }

    fn read_field(&mut self) -> Result<(u32, WireValue<'a>)> {
        let key_at = self.pos;
        let (key, next) =
            read_varint(self.data, self.pos).ok_or(WireError::TruncatedVarint { offset: key_at })?;
        self.pos = next;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;

        let value = match wire_type {
            WIRE_VARINT => {
                let (v, next) = read_varint(self.data, self.pos)
                    .ok_or(WireError::TruncatedVarint { offset: self.pos })?;
                self.pos = next;
                WireValue::Varint(v)
            }
            WIRE_FIXED64 => WireValue::Fixed64(self.take_array(field)?),
            WIRE_LEN => {
                let (len, next) = read_varint(self.data, self.pos)
                    .ok_or(WireError::TruncatedVarint { offset: self.pos })?;
                self.pos = next;
                let left = self.data.len() - self.pos;
                if len > left as u64 {
                    return Err(WireError::truncated_field(field, self.pos, len as usize, left));
                }
                let bytes = &self.data[self.pos..self.pos + len as usize];
                self.pos += len as usize;
                WireValue::Bytes(bytes)
            }
            WIRE_FIXED32 => WireValue::Fixed32(self.take_array(field)?),
            other => return Err(WireError::unsupported_wire_type(field, other, key_at)),
        };
        Ok((field, value))
    }

    fn take_array<const N: usize>(&mut self, field: u32) -> Result<[u8; N]> {
        let left = self.data.len() - self.pos;
        if left < N {
            return Err(WireError::truncated_field(field, self.pos, N, left));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<(u32, WireValue<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let item = self.read_field();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Field key: `(field_number << 3) | wire_type`.
pub fn field_key(field: u32, wire_type: u8) -> u64 {
    (u64::from(field) << 3) | u64::from(wire_type)
}

/// Append a field key.
pub fn write_key(buf: &mut Vec<u8>, field: u32, wire_type: u8) {
    write_varint(buf, field_key(field, wire_type));
}

/// Append a varint field.
pub fn write_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    write_key(buf, field, WIRE_VARINT);
    write_varint(buf, value);
}

/// Append a varint field, skipping it when zero (proto3 default).
pub fn write_nonzero_field(buf: &mut Vec<u8>, field: u32, value: i32) {
    if value != 0 {
        // int32 fields sign-extend to 64 bits on the wire.
        write_varint_field(buf, field, value as i64 as u64);
    }
}

/// Append a length-delimited field.
pub fn write_bytes_field(buf: &mut Vec<u8>, field: u32, data: &[u8]) {
    write_key(buf, field, WIRE_LEN);
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
