//! Schema-less tag/value scan.
//!
//! Used for payloads with no structured definition (set commands and their
//! replies). Only varint fields are recovered; length-delimited fields are
//! skipped, and any other wire type ends the scan.

use std::collections::BTreeMap;

use crate::varint::decode_varint;
use crate::wire::{WIRE_LEN, WIRE_VARINT};

/// Scan `data` into `field_number -> value`.
///
/// Never fails: on an unsupported wire type the scan stops and the fields
/// decoded so far are returned. A repeated field number keeps its last value.
pub fn parse_fields(data: &[u8]) -> BTreeMap<u32, u64> {
    let mut fields = BTreeMap::new();
    let mut idx = 0;

    while idx < data.len() {
        let (key, next) = decode_varint(data, idx);
        idx = next;
        let field = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u8;

        match wire_type {
            WIRE_VARINT => {
                let (value, next) = decode_varint(data, idx);
                idx = next;
                fields.insert(field, value);
            }
            WIRE_LEN => {
                let (len, next) = decode_varint(data, idx);
                idx = next.saturating_add(len as usize).min(data.len());
            }
            _ => break,
        }
    }

    fields
}

/// Find the first length-delimited field `number` and return its bytes.
///
/// Companion to [`parse_fields`] for callers that need one nested field's
/// content. Stops at the same point the scan would.
pub fn find_nested(data: &[u8], number: u32) -> Option<&[u8]> {
    let mut idx = 0;
    while idx < data.len() {
        let (key, next) = decode_varint(data, idx);
        idx = next;
        match (key & 0x7) as u8 {
            WIRE_VARINT => idx = decode_varint(data, idx).1,
            WIRE_LEN => {
                let (len, next) = decode_varint(data, idx);
                let end = next.saturating_add(len as usize).min(data.len());
                if (key >> 3) as u32 == number {
                    return Some(&data[next..end]);
                }
                idx = end;
            }
            _ => break,
        }
    }
    None
}
