//! Avro binary decoder for primitive and complex types.
//!
//! The decoder follows the Avro specification for binary encoding:
//! - Ints and longs are zigzag varints
//! - Floats and doubles are little-endian IEEE 754
//! - Bytes and strings are length-prefixed
//! - Arrays and maps are sequences of count-prefixed blocks ending in a zero count
//!
//! Every decoder reads through a [`ByteSource`], so the same code serves
//! in-memory buffers and blocking streams.

use std::collections::{BTreeMap, HashMap};

use crate::error::DecodeError;
use crate::schema::{AvroSchema, EnumSchema, Primitive, RecordSchema};
use crate::source::ByteSource;
use crate::value::AvroValue;

use super::varint::{decode_varint, decode_zigzag};

/// Upper bound on capacity reserved from an untrusted block count.
const MAX_RESERVE: usize = 1024;

/// Default limit on array and map items decoded within one top-level value.
pub const DEFAULT_MAX_COLLECTION_ITEMS: usize = 1 << 22;

/// Schema-driven Avro decoder over a byte source.
///
/// # Example
/// ```
/// use contrail::reader::Decoder;
/// use contrail::schema::parse_schema;
/// use contrail::source::SliceSource;
/// use contrail::AvroValue;
///
/// let schema = parse_schema(r#"{"type": "array", "items": "long"}"#);
/// let mut decoder = Decoder::new(SliceSource::new(&[0x04, 0x06, 0x36, 0x00]));
/// let value = decoder.decode_value(&schema).unwrap();
/// assert_eq!(value, AvroValue::Array(vec![AvroValue::Long(3), AvroValue::Long(27)]));
/// ```
///
/// Block counts come from the input, and items such as `null` take no bytes,
/// so the number of array and map items in one value is capped by
/// [`Decoder::max_collection_items`].
#[derive(Debug)]
pub struct Decoder<S: ByteSource> {
    source: S,
    max_collection_items: usize,
    items_in_value: usize,
    depth: usize,
}

impl<S: ByteSource> Decoder<S> {
    /// Create a decoder reading from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_collection_items: DEFAULT_MAX_COLLECTION_ITEMS,
            items_in_value: 0,
            depth: 0,
        }
    }

    /// Set the limit on array and map items decoded within one value.
    pub fn with_max_collection_items(mut self, max_collection_items: usize) -> Self {
        self.max_collection_items = max_collection_items;
        self
    }

    /// The limit on array and map items decoded within one value.
    pub fn max_collection_items(&self) -> usize {
        self.max_collection_items
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the underlying source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Check whether the source has no more bytes.
    pub fn is_exhausted(&mut self) -> Result<bool, DecodeError> {
        self.source.is_exhausted()
    }

    /// Decode a null value (no-op, consumes no bytes).
    #[inline]
    pub fn decode_null(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Decode a boolean. Any nonzero byte is `true`.
    #[inline]
    pub fn decode_boolean(&mut self) -> Result<bool, DecodeError> {
        Ok(self.source.read_byte()? != 0)
    }

    /// Decode a 32-bit signed integer (zigzag varint encoded).
    ///
    /// # Errors
    /// `DecodeError::IntegerOverflow` if the encoded long does not fit in `i32`.
    #[inline]
    pub fn decode_int(&mut self) -> Result<i32, DecodeError> {
        let long = self.decode_long()?;
        i32::try_from(long).map_err(|_| DecodeError::IntegerOverflow(long))
    }

    /// Decode a 64-bit signed integer (zigzag varint encoded).
    #[inline]
    pub fn decode_long(&mut self) -> Result<i64, DecodeError> {
        decode_zigzag(&mut self.source)
    }

    /// Decode an unsigned variable-length integer.
    #[inline]
    pub fn decode_varint(&mut self) -> Result<u64, DecodeError> {
        decode_varint(&mut self.source)
    }

    /// Decode a 32-bit IEEE 754 floating-point number (little-endian).
    #[inline]
    pub fn decode_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.source.read_array::<4>()?))
    }

    /// Decode a 64-bit IEEE 754 floating-point number (little-endian).
    #[inline]
    pub fn decode_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.source.read_array::<8>()?))
    }

    /// Decode a byte array (length-prefixed).
    pub fn decode_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.decode_length()?;
        self.source.read_vec(len)
    }

    /// Decode a UTF-8 string (length-prefixed).
    pub fn decode_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.decode_bytes()?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Decode a fixed-size byte array. The size comes from the schema, not the stream.
    pub fn decode_fixed(&mut self, size: usize) -> Result<Vec<u8>, DecodeError> {
        self.source.read_vec(size)
    }

    /// Decode an enum value, returning `(index, symbol)`.
    ///
    /// An index outside `[0, symbols.len())` is an error; no default symbol
    /// is substituted.
    pub fn decode_enum(&mut self, schema: &EnumSchema) -> Result<(usize, String), DecodeError> {
        let index = i64::from(self.decode_int()?);
        let position = checked_index("Enum", index, schema.symbols.len())?;
        Ok((position, schema.symbols[position].clone()))
    }

    /// Decode a union branch index, validated against `num_variants`.
    pub fn decode_union_index(&mut self, num_variants: usize) -> Result<usize, DecodeError> {
        let index = self.decode_long()?;
        checked_index("Union", index, num_variants)
    }

    /// Decode a non-negative length prefix.
    fn decode_length(&mut self) -> Result<usize, DecodeError> {
        let len = self.decode_long()?;
        usize::try_from(len)
            .map_err(|_| DecodeError::InvalidData(format!("Negative length: {}", len)))
    }

    /// Decode the item count of the next array or map block.
    ///
    /// A negative count is followed by the block's size in bytes, which is
    /// read and discarded: every block is resolvable here, so none is skipped.
    /// Zero marks the end of the collection.
    pub fn decode_block_count(&mut self) -> Result<usize, DecodeError> {
        let count = self.decode_long()?;
        let items = if count < 0 {
            let _byte_size = self.decode_long()?;
            count.unsigned_abs()
        } else {
            count as u64
        };
        usize::try_from(items)
            .map_err(|_| DecodeError::InvalidData(format!("Block count {} too large", count)))
    }

    /// Count `count` more collection items against the per-value limit.
    fn charge_items(&mut self, count: usize) -> Result<(), DecodeError> {
        let total = self.items_in_value.saturating_add(count);
        if total > self.max_collection_items {
            return Err(DecodeError::InvalidData(format!(
                "Collection items {} exceed limit of {}",
                total, self.max_collection_items
            )));
        }
        self.items_in_value = total;
        Ok(())
    }

    /// Decode an array of values.
    pub fn decode_array(&mut self, item_schema: &AvroSchema) -> Result<Vec<AvroValue>, DecodeError> {
        if self.depth == 0 {
            self.items_in_value = 0;
        }
        let mut items = Vec::new();
        loop {
            let count = self.decode_block_count()?;
            if count == 0 {
                break;
            }
            self.charge_items(count)?;
            items.reserve(count.min(MAX_RESERVE));
            for _ in 0..count {
                items.push(self.decode_value(item_schema)?);
            }
        }
        Ok(items)
    }

    /// Decode a map with string keys. A repeated key keeps its last value.
    pub fn decode_map(
        &mut self,
        value_schema: &AvroSchema,
    ) -> Result<BTreeMap<String, AvroValue>, DecodeError> {
        if self.depth == 0 {
            self.items_in_value = 0;
        }
        let mut entries = BTreeMap::new();
        loop {
            let count = self.decode_block_count()?;
            if count == 0 {
                break;
            }
            self.charge_items(count)?;
            for _ in 0..count {
                let key = self.decode_string()?;
                let value = self.decode_value(value_schema)?;
                entries.insert(key, value);
            }
        }
        Ok(entries)
    }

    /// Decode a record: field values in schema declaration order.
    pub fn decode_record(
        &mut self,
        schema: &RecordSchema,
    ) -> Result<HashMap<String, AvroValue>, DecodeError> {
        let mut fields = HashMap::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = self.decode_value(&field.schema)?;
            fields.insert(field.name.clone(), value);
        }
        Ok(fields)
    }

    /// Decode any Avro value based on its schema.
    ///
    /// A union yields the value of the selected branch; nothing records that
    /// it came through a union.
    pub fn decode_value(&mut self, schema: &AvroSchema) -> Result<AvroValue, DecodeError> {
        if self.depth == 0 {
            self.items_in_value = 0;
        }
        self.depth += 1;
        let value = self.decode_nested(schema);
        self.depth -= 1;
        value
    }

    fn decode_nested(&mut self, schema: &AvroSchema) -> Result<AvroValue, DecodeError> {
        match schema {
            AvroSchema::Primitive(p) => self.decode_primitive(*p),
            AvroSchema::Record(record) => self.decode_record(record).map(AvroValue::Record),
            AvroSchema::Enum(enum_schema) => {
                let (index, symbol) = self.decode_enum(enum_schema)?;
                Ok(AvroValue::Enum { symbol, index })
            }
            AvroSchema::Array(items) => self.decode_array(items).map(AvroValue::Array),
            AvroSchema::Map(values) => self.decode_map(values).map(AvroValue::Map),
            AvroSchema::Union(variants) => {
                let index = self.decode_union_index(variants.len())?;
                self.decode_value(&variants[index])
            }
            AvroSchema::Fixed(fixed) => self.decode_fixed(fixed.size).map(AvroValue::Fixed),
            AvroSchema::Invalid => Err(DecodeError::InvalidData(
                "Cannot decode under an invalid schema".to_string(),
            )),
        }
    }

    fn decode_primitive(&mut self, primitive: Primitive) -> Result<AvroValue, DecodeError> {
        Ok(match primitive {
            Primitive::Null => {
                self.decode_null()?;
                AvroValue::Null
            }
            Primitive::Boolean => AvroValue::Boolean(self.decode_boolean()?),
            Primitive::Int => AvroValue::Int(self.decode_int()?),
            Primitive::Long => AvroValue::Long(self.decode_long()?),
            Primitive::Float => AvroValue::Float(self.decode_float()?),
            Primitive::Double => AvroValue::Double(self.decode_double()?),
            Primitive::Bytes => AvroValue::Bytes(self.decode_bytes()?),
            Primitive::String => AvroValue::String(self.decode_string()?),
        })
    }
}

fn checked_index(kind: &'static str, index: i64, len: usize) -> Result<usize, DecodeError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or(DecodeError::IndexOutOfRange { kind, index, len })
}
