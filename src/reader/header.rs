//! Avro file header
//!
//! The Object Container File header is itself an Avro record, encoded under
//! a fixed bootstrap schema:
//! - Magic bytes ("Obj\x01"), `fixed(4)`
//! - Metadata map (including the schema JSON), `map<bytes>`
//! - 16-byte sync marker, `fixed(16)`

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{EncodeError, ReaderError};
use crate::reader::Decoder;
use crate::schema::{parse_schema_bytes, AvroSchema, FieldSchema, FixedSchema, Primitive, RecordSchema};
use crate::source::ByteSource;
use crate::value::AvroValue;
use crate::writer::Encoder;

/// The Avro magic bytes that identify an Object Container File.
/// Format: "Obj" followed by version byte (0x01)
pub const AVRO_MAGIC: [u8; 4] = [b'O', b'b', b'j', 0x01];

/// Metadata key holding the writer schema as UTF-8 JSON.
pub const SCHEMA_KEY: &str = "avro.schema";

/// Metadata key naming the block compression codec.
pub const CODEC_KEY: &str = "avro.codec";

/// The only codec supported: uncompressed blocks.
pub const NULL_CODEC: &str = "null";

/// Prefix of metadata keys reserved for the container format.
pub const RESERVED_PREFIX: &str = "avro.";

/// Size of the sync marker in bytes
pub const SYNC_MARKER_SIZE: usize = 16;

const MAGIC_FIELD: &str = "magic";
const META_FIELD: &str = "meta";
const SYNC_FIELD: &str = "sync";

fn magic_schema() -> AvroSchema {
    AvroSchema::Fixed(FixedSchema::new("Magic", AVRO_MAGIC.len()))
}

fn meta_schema() -> AvroSchema {
    AvroSchema::Map(Box::new(AvroSchema::Primitive(Primitive::Bytes)))
}

fn sync_schema() -> AvroSchema {
    AvroSchema::Fixed(FixedSchema::new("Sync", SYNC_MARKER_SIZE))
}

/// The bootstrap schema every container header is encoded under.
pub fn header_schema() -> AvroSchema {
    AvroSchema::Record(RecordSchema::new(
        "org.apache.avro.file.Header",
        vec![
            FieldSchema::new(MAGIC_FIELD, magic_schema()),
            FieldSchema::new(META_FIELD, meta_schema()),
            FieldSchema::new(SYNC_FIELD, sync_schema()),
        ],
    ))
}

/// Parsed Avro file header containing schema and metadata.
#[derive(Debug, Clone)]
pub struct AvroHeader {
    /// Metadata key-value pairs from the header
    pub metadata: HashMap<String, Vec<u8>>,
    /// 16-byte sync marker used to identify block boundaries
    pub sync_marker: [u8; SYNC_MARKER_SIZE],
    /// Parsed Avro schema from metadata
    pub schema: Arc<AvroSchema>,
}

impl AvroHeader {
    /// Decode a header from the start of a container.
    ///
    /// The three header fields are decoded in order under their bootstrap
    /// schemas, each with its own failure.
    ///
    /// # Errors
    /// - `ReaderError::InvalidMagic` if the input does not start with `Obj\x01`
    /// - `ReaderError::Header` if the metadata map cannot be decoded
    /// - `ReaderError::InvalidSchema` if `avro.schema` is missing or invalid
    /// - `ReaderError::UnsupportedCodec` if `avro.codec` is set to anything but `null`
    /// - `ReaderError::UnreadableSync` if the sync marker cannot be read
    pub fn read<S: ByteSource>(decoder: &mut Decoder<S>) -> Result<Self, ReaderError> {
        let magic = decoder
            .decode_value(&magic_schema())
            .map_err(|_| ReaderError::InvalidMagic(Vec::new()))?;
        if magic.as_bytes() != Some(&AVRO_MAGIC[..]) {
            return Err(ReaderError::InvalidMagic(
                magic.as_bytes().unwrap_or_default().to_vec(),
            ));
        }

        let metadata = match decoder.decode_value(&meta_schema()) {
            Ok(AvroValue::Map(entries)) => entries
                .into_iter()
                .map(|(key, value)| match value {
                    AvroValue::Bytes(bytes) => Ok((key, bytes)),
                    other => Err(ReaderError::InvalidSchema(format!(
                        "Metadata '{}' decoded as {}",
                        key,
                        other.kind()
                    ))),
                })
                .collect::<Result<HashMap<_, _>, _>>()?,
            Ok(other) => {
                return Err(ReaderError::InvalidSchema(format!(
                    "Metadata decoded as {}",
                    other.kind()
                )))
            }
            Err(e) => return Err(ReaderError::Header(e)),
        };

        let schema = Self::extract_schema(&metadata)?;
        Self::check_codec(&metadata)?;

        let sync_marker = decoder
            .source_mut()
            .read_array::<SYNC_MARKER_SIZE>()
            .map_err(ReaderError::UnreadableSync)?;

        Ok(Self {
            metadata,
            sync_marker,
            schema: Arc::new(schema),
        })
    }

    /// Extract and parse the schema from metadata.
    fn extract_schema(metadata: &HashMap<String, Vec<u8>>) -> Result<AvroSchema, ReaderError> {
        let schema_bytes = metadata
            .get(SCHEMA_KEY)
            .ok_or_else(|| ReaderError::InvalidSchema(format!("Missing '{}' in metadata", SCHEMA_KEY)))?;

        if std::str::from_utf8(schema_bytes).is_err() {
            return Err(ReaderError::InvalidSchema(
                "Schema is not valid UTF-8".to_string(),
            ));
        }

        match parse_schema_bytes(schema_bytes) {
            AvroSchema::Invalid => Err(ReaderError::InvalidSchema(
                String::from_utf8_lossy(schema_bytes).into_owned(),
            )),
            schema => Ok(schema),
        }
    }

    /// Accept a missing codec or the null codec.
    fn check_codec(metadata: &HashMap<String, Vec<u8>>) -> Result<(), ReaderError> {
        match metadata.get(CODEC_KEY) {
            None => Ok(()),
            Some(codec) if codec.as_slice() == NULL_CODEC.as_bytes() => Ok(()),
            Some(codec) => Err(ReaderError::UnsupportedCodec(
                String::from_utf8_lossy(codec).into_owned(),
            )),
        }
    }

    /// Encode a header for a new container.
    ///
    /// `extra` entries are written alongside the schema; an `avro.schema`
    /// entry among them is replaced by `schema_json`.
    pub fn encode(
        schema_json: &str,
        extra: &BTreeMap<String, Vec<u8>>,
        sync_marker: &[u8; SYNC_MARKER_SIZE],
    ) -> Result<Bytes, EncodeError> {
        let mut meta: BTreeMap<String, AvroValue> = extra
            .iter()
            .map(|(key, value)| (key.clone(), AvroValue::Bytes(value.clone())))
            .collect();
        meta.insert(
            SCHEMA_KEY.to_string(),
            AvroValue::Bytes(schema_json.as_bytes().to_vec()),
        );

        let header = AvroValue::record([
            (MAGIC_FIELD, AvroValue::Fixed(AVRO_MAGIC.to_vec())),
            (META_FIELD, AvroValue::Map(meta)),
            (SYNC_FIELD, AvroValue::Fixed(sync_marker.to_vec())),
        ]);

        let mut encoder = Encoder::new();
        header.encode(&mut encoder, &header_schema())?;
        Ok(encoder.into_bytes())
    }

    /// Get the schema as a JSON string, exactly as stored in the file.
    pub fn schema_json(&self) -> Option<&str> {
        self.get_metadata_string(SCHEMA_KEY)
    }

    /// Get a metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(|v| v.as_slice())
    }

    /// Get a metadata value as a string.
    pub fn get_metadata_string(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::super::varint::encode_zigzag;
    use super::*;
    use crate::source::SliceSource;

    const SYNC: [u8; 16] = [
        0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE,
        0xF0,
    ];

    /// Helper to create a minimal header by hand
    fn create_test_header(schema_json: &str) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&AVRO_MAGIC);

        header.extend_from_slice(&encode_zigzag(1));
        let schema_key = SCHEMA_KEY.as_bytes();
        header.extend_from_slice(&encode_zigzag(schema_key.len() as i64));
        header.extend_from_slice(schema_key);
        header.extend_from_slice(&encode_zigzag(schema_json.len() as i64));
        header.extend_from_slice(schema_json.as_bytes());
        header.push(0x00);

        header.extend_from_slice(&SYNC);
        header
    }

    fn parse(bytes: &[u8]) -> Result<AvroHeader, ReaderError> {
        AvroHeader::read(&mut Decoder::new(SliceSource::new(bytes)))
    }

    #[test]
    fn test_avro_magic_constant() {
        assert_eq!(AVRO_MAGIC, [0x4F, 0x62, 0x6A, 0x01]);
    }

    #[test]
    fn test_parse_header_simple_schema() {
        let header = parse(&create_test_header(r#""string""#)).unwrap();
        assert_eq!(*header.schema, AvroSchema::Primitive(Primitive::String));
        assert_eq!(header.sync_marker, SYNC);
        assert_eq!(header.schema_json(), Some(r#""string""#));
    }

    #[test]
    fn test_encode_matches_hand_built_header() {
        let encoded = AvroHeader::encode(r#""long""#, &BTreeMap::new(), &SYNC).unwrap();
        assert_eq!(&encoded[..], &create_test_header(r#""long""#)[..]);
    }

    #[test]
    fn test_parse_header_invalid_magic() {
        let mut bytes = create_test_header(r#""null""#);
        bytes[0] = b'X';
        assert!(matches!(parse(&bytes), Err(ReaderError::InvalidMagic(_))));
        assert!(matches!(parse(&[b'O', b'b']), Err(ReaderError::InvalidMagic(_))));
    }

    #[test]
    fn test_parse_header_missing_schema() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&AVRO_MAGIC);
        bytes.push(0x00);
        bytes.extend_from_slice(&SYNC);
        assert!(matches!(parse(&bytes), Err(ReaderError::InvalidSchema(_))));
    }

    #[test]
    fn test_parse_header_invalid_schema() {
        let bytes = create_test_header(r#"{"type": "record", "name": "R"}"#);
        assert!(matches!(parse(&bytes), Err(ReaderError::InvalidSchema(_))));
        let bytes = create_test_header(r#"{"invalid json"#);
        assert!(matches!(parse(&bytes), Err(ReaderError::InvalidSchema(_))));
    }

    #[test]
    fn test_parse_header_truncated_sync() {
        let mut bytes = create_test_header(r#""int""#);
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(parse(&bytes), Err(ReaderError::UnreadableSync(_))));
    }

    #[test]
    fn test_extra_metadata_cannot_replace_schema() {
        let mut extra = BTreeMap::new();
        extra.insert("app.owner".to_string(), b"ingest".to_vec());
        extra.insert(SCHEMA_KEY.to_string(), b"\"boolean\"".to_vec());
        let encoded = AvroHeader::encode(r#""double""#, &extra, &SYNC).unwrap();
        let header = parse(&encoded).unwrap();
        assert_eq!(*header.schema, AvroSchema::Primitive(Primitive::Double));
        assert_eq!(header.get_metadata_string("app.owner"), Some("ingest"));
    }

    #[test]
    fn test_null_codec_accepted() {
        let mut extra = BTreeMap::new();
        extra.insert(CODEC_KEY.to_string(), NULL_CODEC.as_bytes().to_vec());
        let encoded = AvroHeader::encode(r#""int""#, &extra, &SYNC).unwrap();
        let header = parse(&encoded).unwrap();
        assert_eq!(header.get_metadata_string(CODEC_KEY), Some("null"));
    }

    #[test]
    fn test_compressed_codec_rejected() {
        for codec in [&b"deflate"[..], &b"snappy"[..], &b""[..], &b"\xff"[..]] {
            let mut extra = BTreeMap::new();
            extra.insert(CODEC_KEY.to_string(), codec.to_vec());
            let encoded = AvroHeader::encode(r#""int""#, &extra, &SYNC).unwrap();
            assert!(matches!(
                parse(&encoded),
                Err(ReaderError::UnsupportedCodec(_))
            ));
        }
    }
}
