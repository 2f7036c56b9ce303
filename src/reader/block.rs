//! Avro block framing
//!
//! Each data block in an Object Container File contains:
//! - Record count (zigzag long)
//! - Payload size in bytes (zigzag long)
//! - Payload bytes: the records, back to back, with no extra framing
//! - 16-byte sync marker, equal to the one in the file header

use bytes::Bytes;

use crate::error::{DecodeError, ReaderError};
use crate::reader::Decoder;
use crate::source::ByteSource;
use crate::writer::Encoder;

use super::header::SYNC_MARKER_SIZE;
use super::varint::MAX_VARINT_LEN;

/// A single data block from an Avro file.
#[derive(Debug, Clone)]
pub struct AvroBlock {
    /// Number of records in this block
    pub record_count: usize,
    /// The serialized records
    pub data: Bytes,
    /// Sequential block number (0-indexed)
    pub block_index: usize,
}

impl AvroBlock {
    /// Read the next block and validate its trailing sync marker.
    ///
    /// # Errors
    /// - `ReaderError::Block` if the count, size or payload cannot be read
    /// - `ReaderError::InvalidSyncMarker` if the sync marker doesn't match
    pub fn read<S: ByteSource>(
        decoder: &mut Decoder<S>,
        expected_sync: &[u8; SYNC_MARKER_SIZE],
        block_index: usize,
    ) -> Result<Self, ReaderError> {
        let framing = |source: DecodeError| ReaderError::Block {
            block_index,
            source,
        };

        let record_count = decoder.decode_long().map_err(framing)?;
        let record_count = usize::try_from(record_count).map_err(|_| {
            framing(DecodeError::InvalidData(format!(
                "Invalid negative record count: {}",
                record_count
            )))
        })?;

        let size = decoder.decode_long().map_err(framing)?;
        let size = usize::try_from(size).map_err(|_| {
            framing(DecodeError::InvalidData(format!(
                "Invalid negative block size: {}",
                size
            )))
        })?;

        let data = Bytes::from(decoder.source_mut().read_vec(size).map_err(framing)?);

        let sync_marker = decoder
            .source_mut()
            .read_array::<SYNC_MARKER_SIZE>()
            .map_err(framing)?;
        if &sync_marker != expected_sync {
            return Err(ReaderError::InvalidSyncMarker {
                block_index,
                expected: *expected_sync,
                actual: sync_marker,
            });
        }

        Ok(Self {
            record_count,
            data,
            block_index,
        })
    }

    /// Check if this block is empty (contains no records).
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Frame `payload` as a block: count, length-prefixed payload, sync marker.
    pub fn encode(
        record_count: usize,
        payload: &[u8],
        sync_marker: &[u8; SYNC_MARKER_SIZE],
    ) -> Bytes {
        let mut encoder =
            Encoder::with_capacity(payload.len() + 2 * MAX_VARINT_LEN + SYNC_MARKER_SIZE);
        encoder.encode_length(record_count);
        encoder.encode_bytes(payload);
        encoder.encode_fixed(sync_marker);
        encoder.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    const SYNC: [u8; 16] = [0xAB; 16];

    fn read(bytes: &[u8]) -> Result<AvroBlock, ReaderError> {
        AvroBlock::read(&mut Decoder::new(SliceSource::new(bytes)), &SYNC, 3)
    }

    #[test]
    fn test_encode_layout() {
        let framed = AvroBlock::encode(2, &[0x06, 0x36], &SYNC);
        let mut expected = vec![0x04, 0x04, 0x06, 0x36];
        expected.extend_from_slice(&SYNC);
        assert_eq!(&framed[..], &expected[..]);
    }

    #[test]
    fn test_read_block() {
        let framed = AvroBlock::encode(2, &[0x06, 0x36], &SYNC);
        let block = read(&framed).unwrap();
        assert_eq!(block.record_count, 2);
        assert_eq!(&block.data[..], &[0x06, 0x36]);
        assert_eq!(block.block_index, 3);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_read_block_wrong_sync() {
        let framed = AvroBlock::encode(1, &[0x00], &[0xCD; 16]);
        match read(&framed) {
            Err(ReaderError::InvalidSyncMarker {
                block_index,
                expected,
                actual,
            }) => {
                assert_eq!(block_index, 3);
                assert_eq!(expected, SYNC);
                assert_eq!(actual, [0xCD; 16]);
            }
            other => panic!("expected InvalidSyncMarker, got {:?}", other),
        }
    }

    #[test]
    fn test_read_block_negative_count() {
        let mut bytes = vec![0x01, 0x00];
        bytes.extend_from_slice(&SYNC);
        assert!(matches!(
            read(&bytes),
            Err(ReaderError::Block { block_index: 3, .. })
        ));
    }

    #[test]
    fn test_read_block_truncated_payload() {
        let framed = AvroBlock::encode(1, &[1, 2, 3, 4], &SYNC);
        assert!(matches!(
            read(&framed[..4]),
            Err(ReaderError::Block {
                source: DecodeError::UnexpectedEof,
                ..
            })
        ));
    }
}
