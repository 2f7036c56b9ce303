//! Avro binary encoder
//!
//! An append-only byte buffer with primitive Avro encoders and a
//! checkpoint/revert pair used to roll back partially written values.

use bytes::{BufMut, Bytes, BytesMut};

use crate::reader::varint::put_zigzag;

/// Append-only Avro binary encoder.
///
/// # Example
/// ```
/// use contrail::writer::Encoder;
///
/// let mut encoder = Encoder::new();
/// encoder.encode_long(3_209_099);
/// assert_eq!(encoder.as_bytes(), &[0x96, 0xDE, 0x87, 0x03]);
///
/// encoder.checkpoint();
/// encoder.encode_string("discarded");
/// encoder.revert();
/// assert_eq!(encoder.len(), 4);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: BytesMut,
    checkpoint: usize,
}

impl Encoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty encoder with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            checkpoint: 0,
        }
    }

    /// Number of bytes encoded so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been encoded.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Record the current length as the rollback point.
    pub fn checkpoint(&mut self) {
        self.checkpoint = self.buf.len();
    }

    /// Length recorded by the last `checkpoint()`.
    pub fn checkpoint_len(&self) -> usize {
        self.checkpoint
    }

    /// Drop everything written since the last `checkpoint()`.
    pub fn revert(&mut self) {
        self.buf.truncate(self.checkpoint);
    }

    /// Truncate to `len` bytes. Used for nested rollback, which cannot share
    /// the single checkpoint slot.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
        self.checkpoint = self.checkpoint.min(len);
    }

    /// Take the encoded bytes, leaving the encoder empty.
    pub fn take(&mut self) -> Bytes {
        self.checkpoint = 0;
        self.buf.split().freeze()
    }

    /// Discard all bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.checkpoint = 0;
    }

    /// Consume the encoder, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Null values have no binary representation.
    #[inline]
    pub fn encode_null(&mut self) {}

    /// Encode a boolean as a single `0x00` or `0x01` byte.
    #[inline]
    pub fn encode_boolean(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    /// Encode a 32-bit int as a zigzag varint.
    #[inline]
    pub fn encode_int(&mut self, value: i32) {
        put_zigzag(&mut self.buf, i64::from(value));
    }

    /// Encode a 64-bit long as a zigzag varint.
    #[inline]
    pub fn encode_long(&mut self, value: i64) {
        put_zigzag(&mut self.buf, value);
    }

    /// Encode a float as 4 little-endian bytes.
    #[inline]
    pub fn encode_float(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    /// Encode a double as 8 little-endian bytes.
    #[inline]
    pub fn encode_double(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    /// Encode length-prefixed bytes.
    pub fn encode_bytes(&mut self, value: &[u8]) {
        self.encode_length(value.len());
        self.buf.put_slice(value);
    }

    /// Encode a length-prefixed UTF-8 string.
    pub fn encode_string(&mut self, value: &str) {
        self.encode_bytes(value.as_bytes());
    }

    /// Encode raw bytes with no length prefix.
    pub fn encode_fixed(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    /// Encode a length or block count as a zigzag long.
    #[inline]
    pub(crate) fn encode_length(&mut self, len: usize) {
        // Lengths beyond i64::MAX cannot exist in memory.
        self.encode_long(len as i64);
    }
}
