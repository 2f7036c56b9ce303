//! Avro file reader components
//!
//! This module provides the core reading functionality for Avro files,
//! including header parsing, block framing, container iteration, and
//! binary decoding.

mod block;
mod container;
pub mod decode;
mod header;
pub mod varint;

pub use block::AvroBlock;
pub use container::ContainerReader;
pub use decode::{Decoder, DEFAULT_MAX_COLLECTION_ITEMS};
pub use header::{
    header_schema, AvroHeader, AVRO_MAGIC, CODEC_KEY, NULL_CODEC, RESERVED_PREFIX, SCHEMA_KEY,
    SYNC_MARKER_SIZE,
};
// Re-export varint encoding functions for convenience
pub use varint::{encode_varint, encode_zigzag};
