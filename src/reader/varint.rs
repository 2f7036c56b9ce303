//! Shared varint encoding and decoding utilities.
//!
//! Avro uses the same varint encoding as Protocol Buffers:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Groups are written least-significant first
//!
//! For signed integers, Avro uses zigzag encoding to map signed values to unsigned:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> 63)
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use bytes::BufMut;

use crate::error::DecodeError;
use crate::source::ByteSource;

/// Longest valid varint for a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Fold the sign of `n` into the low bit.
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Reverse `zigzag_encode`.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned variable-length integer.
///
/// # Errors
/// - `DecodeError::UnexpectedEof` if the source ends before the continuation bit clears
/// - `DecodeError::InvalidVarint` if the varint exceeds 10 bytes
#[inline]
pub fn decode_varint<S: ByteSource + ?Sized>(source: &mut S) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let byte = source.read_byte()?;

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }

        shift += 7;

        if shift >= 64 {
            return Err(DecodeError::InvalidVarint);
        }
    }
}

/// Decode a signed variable-length integer (zigzag encoded).
///
/// # Errors
/// Same as [`decode_varint`].
#[inline]
pub fn decode_zigzag<S: ByteSource + ?Sized>(source: &mut S) -> Result<i64, DecodeError> {
    decode_varint(source).map(zigzag_decode)
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Append an unsigned varint to `out`.
#[inline]
pub fn put_varint<B: BufMut>(out: &mut B, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.put_u8(byte);
            return;
        }
        out.put_u8(byte | 0x80);
    }
}

/// Append a zigzag-encoded signed varint to `out`.
#[inline]
pub fn put_zigzag<B: BufMut>(out: &mut B, value: i64) {
    put_varint(out, zigzag_encode(value));
}

/// Encode an unsigned integer as a variable-length integer.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut result = Vec::with_capacity(MAX_VARINT_LEN);
    put_varint(&mut result, value);
    result
}

/// Encode a signed integer as a zigzag-encoded variable-length integer.
pub fn encode_zigzag(value: i64) -> Vec<u8> {
    encode_varint(zigzag_encode(value))
}
