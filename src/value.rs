//! Avro values
//!
//! `AvroValue` mirrors the wire shapes of Avro data. A value never carries
//! its schema: encoding and decoding always pair it with one supplied by
//! the caller.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use crate::error::{DecodeError, EncodeError};
use crate::reader::Decoder;
use crate::schema::{AvroSchema, EnumSchema, Primitive};
use crate::source::{ReadSource, SliceSource};
use crate::writer::Encoder;

/// Represents an Avro value.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Byte array
    Bytes(Vec<u8>),
    /// Fixed-size byte array
    Fixed(Vec<u8>),
    /// Enum symbol and its zero-based index in the schema
    Enum { symbol: String, index: usize },
    /// Array of values
    Array(Vec<AvroValue>),
    /// Map with unique string keys
    Map(BTreeMap<String, AvroValue>),
    /// Record fields by name
    Record(HashMap<String, AvroValue>),
}

impl AvroValue {
    /// Build an enum value, resolving the symbol's index against `schema`.
    pub fn enum_symbol(schema: &EnumSchema, symbol: &str) -> Option<Self> {
        schema.symbol_index(symbol).map(|index| AvroValue::Enum {
            symbol: symbol.to_string(),
            index,
        })
    }

    /// Build a record from `(name, value)` pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AvroValue)>,
    {
        AvroValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the value's tag, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AvroValue::Null => "null",
            AvroValue::Boolean(_) => "boolean",
            AvroValue::Int(_) => "int",
            AvroValue::Long(_) => "long",
            AvroValue::Float(_) => "float",
            AvroValue::Double(_) => "double",
            AvroValue::String(_) => "string",
            AvroValue::Bytes(_) => "bytes",
            AvroValue::Fixed(_) => "fixed",
            AvroValue::Enum { .. } => "enum",
            AvroValue::Array(_) => "array",
            AvroValue::Map(_) => "map",
            AvroValue::Record(_) => "record",
        }
    }

    // ========================================================================
    // Typed accessors
    // ========================================================================

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AvroValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            AvroValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            AvroValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            AvroValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            AvroValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AvroValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a `Bytes` or `Fixed` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AvroValue::Bytes(b) | AvroValue::Fixed(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AvroValue]> {
        match self {
            AvroValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AvroValue>> {
        match self {
            AvroValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&HashMap<String, AvroValue>> {
        match self {
            AvroValue::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&AvroValue> {
        self.as_record().and_then(|fields| fields.get(name))
    }

    pub fn enum_symbol_name(&self) -> Option<&str> {
        match self {
            AvroValue::Enum { symbol, .. } => Some(symbol),
            _ => None,
        }
    }

    pub fn enum_index(&self) -> Option<usize> {
        match self {
            AvroValue::Enum { index, .. } => Some(*index),
            _ => None,
        }
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Check whether this value can be written as a member of a union.
    ///
    /// The tag must match; fixed values must also match the declared size
    /// and enum values must name a declared symbol.
    pub fn matches(&self, schema: &AvroSchema) -> bool {
        match (self, schema) {
            (AvroValue::Null, AvroSchema::Primitive(Primitive::Null))
            | (AvroValue::Boolean(_), AvroSchema::Primitive(Primitive::Boolean))
            | (AvroValue::Int(_), AvroSchema::Primitive(Primitive::Int))
            | (AvroValue::Long(_), AvroSchema::Primitive(Primitive::Long))
            | (AvroValue::Float(_), AvroSchema::Primitive(Primitive::Float))
            | (AvroValue::Double(_), AvroSchema::Primitive(Primitive::Double))
            | (AvroValue::String(_), AvroSchema::Primitive(Primitive::String))
            | (AvroValue::Bytes(_), AvroSchema::Primitive(Primitive::Bytes))
            | (AvroValue::Array(_), AvroSchema::Array(_))
            | (AvroValue::Map(_), AvroSchema::Map(_))
            | (AvroValue::Record(_), AvroSchema::Record(_)) => true,
            (AvroValue::Fixed(bytes), AvroSchema::Fixed(fixed)) => bytes.len() == fixed.size,
            (AvroValue::Enum { symbol, .. }, AvroSchema::Enum(e)) => {
                e.symbol_index(symbol).is_some()
            }
            _ => false,
        }
    }

    /// Encode this value under `schema`, appending to `encoder`.
    ///
    /// On failure the encoder is left byte-for-byte as it was before the call.
    pub fn encode(&self, encoder: &mut Encoder, schema: &AvroSchema) -> Result<(), EncodeError> {
        let start = encoder.len();
        let result = self.encode_unchecked(encoder, schema);
        if result.is_err() {
            encoder.truncate(start);
        }
        result
    }

    /// Encode this value into a new buffer.
    pub fn to_avro_bytes(&self, schema: &AvroSchema) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder, schema)?;
        Ok(encoder.into_bytes().to_vec())
    }

    fn encode_unchecked(&self, encoder: &mut Encoder, schema: &AvroSchema) -> Result<(), EncodeError> {
        match (self, schema) {
            (_, AvroSchema::Invalid) => Err(EncodeError::InvalidSchema),
            (_, AvroSchema::Union(members)) => {
                let index = members
                    .iter()
                    .position(|member| self.matches(member))
                    .ok_or(EncodeError::NoMatchingBranch(self.kind()))?;
                encoder.encode_length(index);
                self.encode_unchecked(encoder, &members[index])
            }
            (AvroValue::Null, AvroSchema::Primitive(Primitive::Null)) => {
                encoder.encode_null();
                Ok(())
            }
            (AvroValue::Boolean(b), AvroSchema::Primitive(Primitive::Boolean)) => {
                encoder.encode_boolean(*b);
                Ok(())
            }
            (AvroValue::Int(i), AvroSchema::Primitive(Primitive::Int)) => {
                encoder.encode_int(*i);
                Ok(())
            }
            (AvroValue::Long(l), AvroSchema::Primitive(Primitive::Long)) => {
                encoder.encode_long(*l);
                Ok(())
            }
            (AvroValue::Float(f), AvroSchema::Primitive(Primitive::Float)) => {
                encoder.encode_float(*f);
                Ok(())
            }
            (AvroValue::Double(d), AvroSchema::Primitive(Primitive::Double)) => {
                encoder.encode_double(*d);
                Ok(())
            }
            (AvroValue::String(s), AvroSchema::Primitive(Primitive::String)) => {
                encoder.encode_string(s);
                Ok(())
            }
            (AvroValue::Bytes(b), AvroSchema::Primitive(Primitive::Bytes)) => {
                encoder.encode_bytes(b);
                Ok(())
            }
            (AvroValue::Fixed(bytes), AvroSchema::Fixed(fixed)) => {
                if bytes.len() != fixed.size {
                    return Err(EncodeError::FixedSizeMismatch {
                        name: fixed.name.clone(),
                        expected: fixed.size,
                        actual: bytes.len(),
                    });
                }
                encoder.encode_fixed(bytes);
                Ok(())
            }
            (AvroValue::Enum { symbol, .. }, AvroSchema::Enum(e)) => {
                let index = e
                    .symbol_index(symbol)
                    .ok_or_else(|| EncodeError::UnknownSymbol {
                        name: e.name.clone(),
                        symbol: symbol.clone(),
                    })?;
                encoder.encode_length(index);
                Ok(())
            }
            (AvroValue::Array(items), AvroSchema::Array(item_schema)) => {
                if !items.is_empty() {
                    encoder.encode_length(items.len());
                    for item in items {
                        item.encode_unchecked(encoder, item_schema)?;
                    }
                }
                encoder.encode_length(0);
                Ok(())
            }
            (AvroValue::Map(entries), AvroSchema::Map(value_schema)) => {
                if !entries.is_empty() {
                    encoder.encode_length(entries.len());
                    for (key, value) in entries {
                        encoder.encode_string(key);
                        value.encode_unchecked(encoder, value_schema)?;
                    }
                }
                encoder.encode_length(0);
                Ok(())
            }
            (AvroValue::Record(fields), AvroSchema::Record(record)) => {
                for field in &record.fields {
                    let value = fields
                        .get(&field.name)
                        .ok_or_else(|| EncodeError::MissingField(field.name.clone()))?;
                    value
                        .encode_unchecked(encoder, &field.schema)
                        .map_err(|e| EncodeError::Field {
                            field: field.name.clone(),
                            source: Box::new(e),
                        })?;
                }
                Ok(())
            }
            (value, schema) => Err(EncodeError::TypeMismatch {
                expected: schema_kind(schema),
                found: value.kind(),
            }),
        }
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode a single value from an in-memory buffer.
    pub fn from_avro_bytes(bytes: &[u8], schema: &AvroSchema) -> Result<Self, DecodeError> {
        Decoder::new(SliceSource::new(bytes)).decode_value(schema)
    }

    /// Decode a single value from a blocking reader.
    pub fn from_reader<R: Read>(reader: R, schema: &AvroSchema) -> Result<Self, DecodeError> {
        Decoder::new(ReadSource::new(reader)).decode_value(schema)
    }
}

fn schema_kind(schema: &AvroSchema) -> &'static str {
    match schema {
        AvroSchema::Primitive(p) => p.name(),
        AvroSchema::Array(_) => "array",
        AvroSchema::Map(_) => "map",
        AvroSchema::Union(_) => "union",
        AvroSchema::Fixed(_) => "fixed",
        AvroSchema::Enum(_) => "enum",
        AvroSchema::Record(_) => "record",
        AvroSchema::Invalid => "invalid",
    }
}

impl From<bool> for AvroValue {
    fn from(value: bool) -> Self {
        AvroValue::Boolean(value)
    }
}

impl From<i32> for AvroValue {
    fn from(value: i32) -> Self {
        AvroValue::Int(value)
    }
}

impl From<i64> for AvroValue {
    fn from(value: i64) -> Self {
        AvroValue::Long(value)
    }
}

impl From<f32> for AvroValue {
    fn from(value: f32) -> Self {
        AvroValue::Float(value)
    }
}

impl From<f64> for AvroValue {
    fn from(value: f64) -> Self {
        AvroValue::Double(value)
    }
}

impl From<&str> for AvroValue {
    fn from(value: &str) -> Self {
        AvroValue::String(value.to_string())
    }
}

impl From<String> for AvroValue {
    fn from(value: String) -> Self {
        AvroValue::String(value)
    }
}

impl From<Vec<u8>> for AvroValue {
    fn from(value: Vec<u8>) -> Self {
        AvroValue::Bytes(value)
    }
}

impl From<Vec<AvroValue>> for AvroValue {
    fn from(value: Vec<AvroValue>) -> Self {
        AvroValue::Array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn person_schema() -> AvroSchema {
        parse_schema(
            r#"{"type": "record", "name": "Person", "fields": [
                {"name": "name", "type": "string"},
                {"name": "age", "type": "int"},
                {"name": "tags", "type": {"type": "array", "items": "string"}}
            ]}"#,
        )
    }

    #[test]
    fn test_record_encodes_in_declaration_order() {
        let value = AvroValue::record([
            ("age", AvroValue::Int(3)),
            ("tags", AvroValue::Array(vec![])),
            ("name", AvroValue::from("a")),
        ]);
        let bytes = value.to_avro_bytes(&person_schema()).unwrap();
        assert_eq!(bytes, vec![0x02, b'a', 0x06, 0x00]);
    }

    #[test]
    fn test_failed_encode_leaves_encoder_unchanged() {
        let mut encoder = Encoder::new();
        encoder.encode_long(99);
        let before = encoder.as_bytes().to_vec();

        // "tags" holds an int where a string is required: fails after
        // name and age have already been written.
        let value = AvroValue::record([
            ("name", AvroValue::from("someone")),
            ("age", AvroValue::Int(40)),
            ("tags", AvroValue::Array(vec![AvroValue::Int(1)])),
        ]);
        let err = value.encode(&mut encoder, &person_schema()).unwrap_err();
        assert!(matches!(err, EncodeError::Field { ref field, .. } if field == "tags"));
        assert_eq!(encoder.as_bytes(), &before[..]);
    }

    #[test]
    fn test_missing_field() {
        let value = AvroValue::record([("name", AvroValue::from("x"))]);
        assert!(matches!(
            value.to_avro_bytes(&person_schema()),
            Err(EncodeError::MissingField(ref f)) if f == "age"
        ));
    }

    #[test]
    fn test_union_picks_first_matching_branch() {
        let schema = parse_schema(r#"["null", "string"]"#);
        assert_eq!(AvroValue::Null.to_avro_bytes(&schema).unwrap(), vec![0x00]);
        assert_eq!(
            AvroValue::from("a").to_avro_bytes(&schema).unwrap(),
            vec![0x02, 0x02, b'a']
        );
        assert!(matches!(
            AvroValue::Int(1).to_avro_bytes(&schema),
            Err(EncodeError::NoMatchingBranch("int"))
        ));
    }

    #[test]
    fn test_union_fixed_matches_by_size() {
        let schema = parse_schema(
            r#"[{"type": "fixed", "name": "A", "size": 2}, {"type": "fixed", "name": "B", "size": 3}]"#,
        );
        let bytes = AvroValue::Fixed(vec![7, 8, 9]).to_avro_bytes(&schema).unwrap();
        assert_eq!(bytes, vec![0x02, 7, 8, 9]);
    }

    #[test]
    fn test_enum_encodes_by_symbol() {
        let schema = parse_schema(r#"{"type": "enum", "name": "E", "symbols": ["foo", "bar"]}"#);
        let AvroSchema::Enum(enum_schema) = &schema else {
            panic!("Expected Enum schema");
        };
        let bar = AvroValue::enum_symbol(enum_schema, "bar").unwrap();
        assert_eq!(bar.enum_index(), Some(1));
        assert_eq!(bar.to_avro_bytes(&schema).unwrap(), vec![0x02]);

        let unknown = AvroValue::Enum {
            symbol: "baz".to_string(),
            index: 0,
        };
        assert!(matches!(
            unknown.to_avro_bytes(&schema),
            Err(EncodeError::UnknownSymbol { .. })
        ));
        assert!(AvroValue::enum_symbol(enum_schema, "baz").is_none());
    }

    #[test]
    fn test_type_mismatch() {
        let schema = AvroSchema::Primitive(Primitive::Long);
        assert!(matches!(
            AvroValue::Int(1).to_avro_bytes(&schema),
            Err(EncodeError::TypeMismatch { expected: "long", found: "int" })
        ));
        assert!(matches!(
            AvroValue::Null.to_avro_bytes(&AvroSchema::Invalid),
            Err(EncodeError::InvalidSchema)
        ));
    }

    #[test]
    fn test_accessors_return_none_on_mismatch() {
        let value = AvroValue::Long(5);
        assert_eq!(value.as_long(), Some(5));
        assert_eq!(value.as_int(), None);
        assert_eq!(value.as_str(), None);
        assert_eq!(value.as_bytes(), None);
        assert_eq!(value.enum_symbol_name(), None);
        assert_eq!(value.enum_index(), None);
        assert!(value.as_array().is_none());
        assert!(value.as_map().is_none());
        assert!(value.field("x").is_none());

        assert_eq!(AvroValue::Fixed(vec![1]).as_bytes(), Some(&[1u8][..]));
    }
}
