//! Base-128 varints as used by protobuf.
//!
//! Seven bits per byte, lowest-order group first. The top bit (0x80) marks a
//! continuation byte.

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a varint starting at `start`, returning `(value, next_index)`.
///
/// Lenient: if `start` is at or past the end of `data` the result is
/// `(0, start)`, and a varint cut off by the end of input yields whatever was
/// accumulated with `next_index == data.len()`. Callers detect exhaustion by
/// comparing the index against the input length before each read.
pub fn decode_varint(data: &[u8], start: usize) -> (u64, usize) {
    let mut result = 0u64;
    let mut shift = 0u32;
    let mut idx = start;

    while idx < data.len() {
        let byte = data[idx];
        idx += 1;
        if shift < 64 {
            result |= u64::from(byte & 0x7F) << shift;
        }
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    (result, idx)
}

/// Strict variant of [`decode_varint`]: `None` if input ends before the
/// terminating byte.
pub fn read_varint(data: &[u8], start: usize) -> Option<(u64, usize)> {
    let (value, next) = decode_varint(data, start);
    if next == start || data[next - 1] & 0x80 != 0 {
        return None;
    }
    Some((value, next))
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a signed value the way the device firmware expects.
///
/// Negative inputs are reinterpreted as unsigned 32-bit (`value & 0xFFFF_FFFF`)
/// before encoding, so `-1` becomes five bytes rather than protobuf's ten.
pub fn encode_varint(value: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(5);
    write_varint(&mut buf, to_wire_unsigned(value));
    buf
}

/// Append an unsigned varint to `buf`.
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    let mut v = value;
    while v > 0x7F {
        buf.push((v as u8 & 0x7F) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

/// Apply the firmware's negative-number convention.
pub fn to_wire_unsigned(value: i64) -> u64 {
    if value < 0 {
        (value as u64) & 0xFFFF_FFFF
    } else {
        value as u64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(1), vec![0x01]);
        assert_eq!(encode_varint(127), vec![0x7F]);
        assert_eq!(encode_varint(128), vec![0x80, 0x01]);
        assert_eq!(encode_varint(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn negative_is_unsigned_32() {
        assert_eq!(encode_varint(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(decode_varint(&encode_varint(-1), 0), (0xFFFF_FFFF, 5));
    }

    #[test]
    fn decode_from_offset() {
        let data = [0xFF, 0xAC, 0x02, 0x05];
        assert_eq!(decode_varint(&data, 1), (300, 3));
        assert_eq!(decode_varint(&data, 3), (5, 4));
    }

    #[test]
    fn decode_past_end_is_zero() {
        assert_eq!(decode_varint(&[0x01], 1), (0, 1));
        assert_eq!(decode_varint(&[], 0), (0, 0));
    }

    #[test]
    fn decode_truncated_stops_at_end() {
        assert_eq!(decode_varint(&[0x80, 0x80], 0), (0, 2));
        assert_eq!(read_varint(&[0x80, 0x80], 0), None);
        assert_eq!(read_varint(&[0x80, 0x01], 0), Some((128, 2)));
    }

    #[test]
    fn overlong_varint_does_not_panic() {
        let data = [0xFF; 20];
        let (_, next) = decode_varint(&data, 0);
        assert_eq!(next, 20);
    }
}
