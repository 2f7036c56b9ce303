//! Avro schemas, binary encoding and Object Container Files
//!
//! This library parses Avro JSON schemas, encodes and decodes values in the
//! Avro binary format, and reads and writes Object Container Files.
//!
//! # Example
//! ```
//! use contrail::reader::ContainerReader;
//! use contrail::schema::parse_schema;
//! use contrail::writer::{ContainerWriter, Sink, WriterConfig};
//! use contrail::AvroValue;
//!
//! let schema = parse_schema(r#"{
//!     "type": "record",
//!     "name": "Point",
//!     "fields": [{"name": "x", "type": "long"}, {"name": "y", "type": "long"}]
//! }"#);
//!
//! let mut writer = ContainerWriter::new(schema, Sink::memory(), WriterConfig::new())?;
//! writer.append(&AvroValue::record([("x", AvroValue::Long(1)), ("y", AvroValue::Long(2))]))?;
//! let bytes = writer.into_memory_bytes()?.unwrap_or_default();
//!
//! let records = ContainerReader::from_bytes(&bytes)?.read_all()?;
//! assert_eq!(records[0].field("y"), Some(&AvroValue::Long(2)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod reader;
pub mod schema;
pub mod source;
pub mod value;
pub mod writer;

// Re-export main types
pub use error::{DecodeError, EncodeError, ReaderError, SchemaError, WriterError};
pub use reader::{AvroBlock, AvroHeader, ContainerReader, Decoder};
pub use schema::{
    parse_schema, parse_schema_bytes, parse_schema_value, AvroSchema, EnumSchema, FieldSchema,
    FixedSchema, Primitive, RecordSchema, TypeTag,
};
pub use source::{BoxedSource, ByteSource, ReadSource, SliceSource};
pub use value::AvroValue;
pub use writer::{ContainerWriter, Encoder, Sink, WriterConfig};
