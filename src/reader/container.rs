//! Object Container File reader
//!
//! `ContainerReader` decodes the header up front, then pulls one block at a
//! time from its source and yields the block's records in order.
//!
//! # Example
//! ```no_run
//! use contrail::reader::ContainerReader;
//!
//! let reader = ContainerReader::open("events.avro")?;
//! println!("schema: {:?}", reader.schema_json());
//! for record in reader {
//!     println!("{:?}", record?);
//! }
//! # Ok::<(), contrail::error::ReaderError>(())
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{DecodeError, ReaderError};
use crate::schema::AvroSchema;
use crate::source::{ByteSource, ReadSource, SliceSource};
use crate::value::AvroValue;

use super::block::AvroBlock;
use super::decode::DEFAULT_MAX_COLLECTION_ITEMS;
use super::header::{AvroHeader, SYNC_MARKER_SIZE};
use super::Decoder;

/// Records left to decode from the current block.
#[derive(Debug)]
struct BlockCursor {
    data: Bytes,
    offset: usize,
    record_count: usize,
    record_index: usize,
    block_index: usize,
}

/// Reader over an Avro Object Container File.
#[derive(Debug)]
pub struct ContainerReader<S: ByteSource> {
    decoder: Decoder<S>,
    header: AvroHeader,
    current: Option<BlockCursor>,
    blocks_read: usize,
    max_collection_items: usize,
    finished: bool,
}

impl ContainerReader<ReadSource<File>> {
    /// Open a container file on disk.
    ///
    /// # Errors
    /// - `ReaderError::Open` if the file cannot be opened
    /// - Any header error from [`ContainerReader::new`]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Opened container file");
        Self::new(ReadSource::new(file))
    }
}

impl<'a> ContainerReader<SliceSource<'a>> {
    /// Read a container held in memory.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ReaderError> {
        Self::new(SliceSource::new(bytes))
    }
}

impl<R: Read> ContainerReader<ReadSource<R>> {
    /// Read a container from a blocking stream.
    pub fn from_reader(reader: R) -> Result<Self, ReaderError> {
        Self::new(ReadSource::new(reader))
    }
}

impl<S: ByteSource> ContainerReader<S> {
    /// Create a reader, decoding the header from `source`.
    ///
    /// # Errors
    /// - `ReaderError::InvalidMagic` if the source is not an Avro container
    /// - `ReaderError::Header` if the header metadata is malformed
    /// - `ReaderError::InvalidSchema` if the embedded schema is missing or invalid
    /// - `ReaderError::UnsupportedCodec` if the blocks are compressed
    /// - `ReaderError::UnreadableSync` if the sync marker cannot be read
    pub fn new(source: S) -> Result<Self, ReaderError> {
        let mut decoder = Decoder::new(source);
        let header = AvroHeader::read(&mut decoder)?;
        info!(
            schema = header.schema_json().unwrap_or_default(),
            metadata_entries = header.metadata.len(),
            "Read container header"
        );
        Ok(Self {
            decoder,
            header,
            current: None,
            blocks_read: 0,
            max_collection_items: DEFAULT_MAX_COLLECTION_ITEMS,
            finished: false,
        })
    }

    /// Set the limit on array and map items in one record, and on the
    /// record count of a block whose records can encode to zero bytes.
    pub fn with_max_collection_items(mut self, max_collection_items: usize) -> Self {
        self.max_collection_items = max_collection_items;
        self
    }

    /// The decoded file header.
    pub fn header(&self) -> &AvroHeader {
        &self.header
    }

    /// The embedded writer schema.
    pub fn schema(&self) -> &Arc<AvroSchema> {
        &self.header.schema
    }

    /// The embedded schema JSON, exactly as stored.
    pub fn schema_json(&self) -> Option<&str> {
        self.header.schema_json()
    }

    /// The file's sync marker.
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.header.sync_marker
    }

    /// All header metadata, including `avro.schema`.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.header.metadata
    }

    /// Number of blocks read so far.
    pub fn blocks_read(&self) -> usize {
        self.blocks_read
    }

    /// Decode the next record, reading a new block when the current one is
    /// used up. Returns `Ok(None)` at the end of the input.
    ///
    /// After an error the reader is finished and yields nothing further.
    pub fn next_record(&mut self) -> Result<Option<AvroValue>, ReaderError> {
        let result = self.advance();
        if result.is_err() {
            self.finished = true;
            self.current = None;
        }
        result
    }

    /// Decode every remaining record.
    pub fn read_all(&mut self) -> Result<Vec<AvroValue>, ReaderError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    fn advance(&mut self) -> Result<Option<AvroValue>, ReaderError> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if cursor.record_index < cursor.record_count {
                    let mut records = Decoder::new(SliceSource::new(&cursor.data[cursor.offset..]))
                        .with_max_collection_items(self.max_collection_items);
                    let value = records.decode_value(&self.header.schema).map_err(|source| {
                        ReaderError::Decode {
                            block_index: cursor.block_index,
                            record_index: cursor.record_index,
                            source,
                        }
                    })?;
                    cursor.offset = cursor.data.len() - records.source().len();
                    cursor.record_index += 1;
                    return Ok(Some(value));
                }
                if cursor.offset < cursor.data.len() {
                    warn!(
                        block_index = cursor.block_index,
                        trailing_bytes = cursor.data.len() - cursor.offset,
                        "Block payload has bytes after its last record"
                    );
                }
                self.current = None;
            }

            if self.finished {
                return Ok(None);
            }

            let block_index = self.blocks_read;
            let exhausted = self
                .decoder
                .is_exhausted()
                .map_err(|source| ReaderError::Block {
                    block_index,
                    source,
                })?;
            if exhausted {
                debug!(blocks = self.blocks_read, "Reached end of container");
                self.finished = true;
                return Ok(None);
            }

            let block = match AvroBlock::read(&mut self.decoder, &self.header.sync_marker, block_index) {
                Ok(block) => block,
                Err(e) => {
                    warn!(block_index, error = %e, "Failed to read block");
                    return Err(e);
                }
            };
            self.check_record_count(&block)?;
            self.blocks_read += 1;
            debug!(
                block_index,
                records = block.record_count,
                bytes = block.data.len(),
                "Read block"
            );
            self.current = Some(BlockCursor {
                data: block.data,
                offset: 0,
                record_count: block.record_count,
                record_index: 0,
                block_index,
            });
        }
    }
}

impl<S: ByteSource> ContainerReader<S> {
    /// Reject a record count the payload cannot hold under the schema.
    fn check_record_count(&self, block: &AvroBlock) -> Result<(), ReaderError> {
        let limit = match self.header.schema.min_encoded_size() {
            0 => self.max_collection_items,
            min => block.data.len() / min,
        };
        if block.record_count > limit {
            return Err(ReaderError::Block {
                block_index: block.block_index,
                source: DecodeError::InvalidData(format!(
                    "Block claims {} records but can hold at most {}",
                    block.record_count, limit
                )),
            });
        }
        Ok(())
    }
}

impl<S: ByteSource> Iterator for ContainerReader<S> {
    type Item = Result<AvroValue, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
