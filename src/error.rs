//! Error types for Avro encoding, decoding and container files

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while rendering a schema.
///
/// Parsing never fails with an error: an unparseable schema is the
/// `AvroSchema::Invalid` value.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema (or one of its children) is invalid and has no JSON form
    #[error("Cannot render an invalid schema")]
    InvalidSchema,
    /// JSON serialization failed
    #[error("JSON rendering failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Source ran out of bytes
    #[error("Unexpected end of data")]
    UnexpectedEof,
    /// Invalid varint encoding
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// A long did not fit in a 32-bit int
    #[error("Integer overflow: {0} does not fit in i32")]
    IntegerOverflow(i64),
    /// Union branch or enum symbol index outside the schema's range
    #[error("{kind} index {index} out of range (0..{len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: i64,
        len: usize,
    },
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Invalid Avro data
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// IO error from a streaming source
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can occur when encoding a value under a schema
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Cannot encode anything under an invalid schema
    #[error("Cannot encode under an invalid schema")]
    InvalidSchema,
    /// The value's tag does not match the schema
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A record field declared by the schema is absent from the value
    #[error("Missing field '{0}'")]
    MissingField(String),
    /// A record field failed to encode
    #[error("Field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: Box<EncodeError>,
    },
    /// Enum symbol not declared by the schema
    #[error("Unknown symbol '{symbol}' for enum '{name}'")]
    UnknownSymbol { name: String, symbol: String },
    /// Fixed value length differs from the declared size
    #[error("Fixed '{name}' expects {expected} bytes, got {actual}")]
    FixedSizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// No union member accepts the value
    #[error("No union branch matches a {0} value")]
    NoMatchingBranch(&'static str),
}

/// Errors reported by the container writer
#[derive(Debug, Error)]
pub enum WriterError {
    /// The sink location uses a scheme the writer cannot open
    #[error("Unsupported sink: {0}")]
    UnsupportedSink(String),
    /// Parent directory could not be created
    #[error("Cannot create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Output file could not be created
    #[error("Cannot create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The schema could not be rendered to JSON for the header
    #[error("Cannot render schema to JSON: {0}")]
    SchemaJson(#[from] SchemaError),
    /// The writer was given an invalid schema
    #[error("Writer schema is invalid")]
    InvalidSchema,
    /// User metadata used a key reserved for the container format
    #[error("Metadata key '{0}' is reserved")]
    ReservedMetadata(String),
    /// The header record failed to encode
    #[error("Cannot encode header: {0}")]
    EncodeHeader(#[source] EncodeError),
    /// A record did not match the writer schema; nothing was written
    #[error("Cannot encode record: {0}")]
    EncodeRecord(#[source] EncodeError),
    /// Short or failed write to the sink
    #[error("Write failed: {0}")]
    Write(#[from] io::Error),
    /// The writer has already been closed
    #[error("Writer is closed")]
    Closed,
}

/// Errors reported by the container reader
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The file or stream could not be opened
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid magic bytes: not an Avro object container
    #[error("Invalid magic bytes: expected 'Obj\\x01', found {0:?}")]
    InvalidMagic(Vec<u8>),

    /// Header metadata could not be decoded
    #[error("Cannot read header: {0}")]
    Header(#[source] DecodeError),

    /// Embedded schema is missing, not UTF-8 JSON, or invalid
    #[error("Invalid embedded schema: {0}")]
    InvalidSchema(String),

    /// Blocks use a compression codec this reader does not decode
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Sync marker in the header could not be read
    #[error("Cannot read sync marker: {0}")]
    UnreadableSync(#[source] DecodeError),

    /// Block framing (count, length or payload) is malformed
    #[error("Malformed block {block_index}: {source}")]
    Block {
        block_index: usize,
        #[source]
        source: DecodeError,
    },

    /// Decode error in block/record
    #[error("Decode error in block {block_index}, record {record_index}: {source}")]
    Decode {
        block_index: usize,
        record_index: usize,
        #[source]
        source: DecodeError,
    },

    /// Invalid sync marker
    #[error("Invalid sync marker after block {block_index}")]
    InvalidSyncMarker {
        block_index: usize,
        expected: [u8; 16],
        actual: [u8; 16],
    },
}
