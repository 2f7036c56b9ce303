//! Avro schema types and representations.
//!
//! This module defines the schema tree built once from a JSON schema
//! document: primitives, arrays, maps, unions, and the named types
//! (records, enums and fixed). `AvroSchema::Invalid` stands for a document
//! that failed to parse and poisons any structure containing it.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// The eight Avro primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,
}

impl Primitive {
    /// The type name used in schema JSON.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }
}

/// Classification of a schema type name.
///
/// Maps the string found under a `"type"` key to the primitive or complex
/// kind it names. Anything unrecognised is `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Primitive(Primitive),
    Record,
    Enum,
    Array,
    Map,
    Fixed,
    Invalid,
}

impl TypeTag {
    /// Classify a type name.
    ///
    /// # Example
    /// ```
    /// use contrail::schema::{Primitive, TypeTag};
    ///
    /// assert_eq!(TypeTag::from_name("long"), TypeTag::Primitive(Primitive::Long));
    /// assert_eq!(TypeTag::from_name("record"), TypeTag::Record);
    /// assert_eq!(TypeTag::from_name("uuid"), TypeTag::Invalid);
    /// ```
    pub fn from_name(name: &str) -> Self {
        match name {
            "null" => TypeTag::Primitive(Primitive::Null),
            "boolean" => TypeTag::Primitive(Primitive::Boolean),
            "int" => TypeTag::Primitive(Primitive::Int),
            "long" => TypeTag::Primitive(Primitive::Long),
            "float" => TypeTag::Primitive(Primitive::Float),
            "double" => TypeTag::Primitive(Primitive::Double),
            "bytes" => TypeTag::Primitive(Primitive::Bytes),
            "string" => TypeTag::Primitive(Primitive::String),
            "record" => TypeTag::Record,
            "enum" => TypeTag::Enum,
            "array" => TypeTag::Array,
            "map" => TypeTag::Map,
            "fixed" => TypeTag::Fixed,
            _ => TypeTag::Invalid,
        }
    }

    /// Check if this tag names a primitive type.
    pub fn is_primitive(self) -> bool {
        matches!(self, TypeTag::Primitive(_))
    }
}

/// Represents an Avro schema.
///
/// Schemas are immutable once built and may be shared read-only between a
/// writer and a reader (wrap in `Arc` to share across threads).
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    /// One of the primitive types.
    Primitive(Primitive),
    /// Array of items with a single schema.
    Array(Box<AvroSchema>),
    /// Map with string keys and values of a single schema.
    Map(Box<AvroSchema>),
    /// Union of member schemas, in declaration order. Members are never unions.
    Union(Vec<AvroSchema>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Record type with named fields.
    Record(RecordSchema),
    /// A schema document that failed to parse.
    Invalid,
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// The fields of the record, in declaration (and wire) order.
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn to_json_value(&self) -> Option<Value> {
        let fields = self
            .fields
            .iter()
            .map(FieldSchema::to_json_value)
            .collect::<Option<Vec<_>>>()?;

        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("record"));
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("fields".to_string(), Value::Array(fields));
        Some(Value::Object(obj))
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: AvroSchema,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: AvroSchema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    fn to_json_value(&self) -> Option<Value> {
        Some(json!({
            "name": &self.name,
            "type": self.schema.to_json_value()?,
        }))
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// The symbols of the enum, in index order.
    pub symbols: Vec<String>,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            symbols,
        }
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// The size in bytes.
    pub size: usize,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl From<Primitive> for AvroSchema {
    fn from(primitive: Primitive) -> Self {
        AvroSchema::Primitive(primitive)
    }
}

impl AvroSchema {
    /// Shorthand for a primitive schema.
    pub fn primitive(primitive: Primitive) -> Self {
        AvroSchema::Primitive(primitive)
    }

    /// Check whether this schema parsed successfully.
    ///
    /// `Invalid` poisons its containers during parsing, so only the root
    /// needs checking for parsed schemas. Hand-built trees are walked fully.
    pub fn is_valid(&self) -> bool {
        match self {
            AvroSchema::Invalid => false,
            AvroSchema::Primitive(_) => true,
            AvroSchema::Array(items) => items.is_valid(),
            AvroSchema::Map(values) => values.is_valid(),
            AvroSchema::Union(members) => members
                .iter()
                .all(|m| !matches!(m, AvroSchema::Union(_)) && m.is_valid()),
            AvroSchema::Fixed(f) => !f.name.is_empty(),
            AvroSchema::Enum(e) => {
                let mut seen = HashSet::with_capacity(e.symbols.len());
                !e.name.is_empty() && e.symbols.iter().all(|s| seen.insert(s.as_str()))
            }
            AvroSchema::Record(r) => {
                !r.name.is_empty() && r.fields.iter().all(|f| f.schema.is_valid())
            }
        }
    }

    /// The fewest bytes any value of this schema encodes to.
    ///
    /// Zero for `null`, `fixed(0)` and records made only of those.
    pub fn min_encoded_size(&self) -> usize {
        match self {
            AvroSchema::Primitive(Primitive::Null) | AvroSchema::Invalid => 0,
            AvroSchema::Primitive(Primitive::Float) => 4,
            AvroSchema::Primitive(Primitive::Double) => 8,
            AvroSchema::Primitive(_) | AvroSchema::Enum(_) => 1,
            AvroSchema::Array(_) | AvroSchema::Map(_) => 1,
            AvroSchema::Fixed(f) => f.size,
            AvroSchema::Union(members) => {
                1 + members
                    .iter()
                    .map(AvroSchema::min_encoded_size)
                    .min()
                    .unwrap_or(0)
            }
            AvroSchema::Record(r) => r
                .fields
                .iter()
                .map(|f| f.schema.min_encoded_size())
                .fold(0usize, usize::saturating_add),
        }
    }

    /// The type tag of this schema. Unions have no tag of their own and
    /// report `Invalid`.
    pub fn tag(&self) -> TypeTag {
        match self {
            AvroSchema::Primitive(p) => TypeTag::Primitive(*p),
            AvroSchema::Array(_) => TypeTag::Array,
            AvroSchema::Map(_) => TypeTag::Map,
            AvroSchema::Fixed(_) => TypeTag::Fixed,
            AvroSchema::Enum(_) => TypeTag::Enum,
            AvroSchema::Record(_) => TypeTag::Record,
            AvroSchema::Union(_) | AvroSchema::Invalid => TypeTag::Invalid,
        }
    }

    /// Get the name of a named type, if applicable.
    pub fn name(&self) -> Option<&str> {
        match self {
            AvroSchema::Record(r) => Some(&r.name),
            AvroSchema::Enum(e) => Some(&e.name),
            AvroSchema::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// The output parses back to an equal schema.
    ///
    /// # Example
    /// ```
    /// use contrail::schema::{AvroSchema, Primitive};
    ///
    /// let schema = AvroSchema::Primitive(Primitive::String);
    /// assert_eq!(schema.to_json().unwrap(), r#""string""#);
    /// ```
    pub fn to_json(&self) -> Result<String, SchemaError> {
        let value = self.to_json_value().ok_or(SchemaError::InvalidSchema)?;
        Ok(serde_json::to_string(&value)?)
    }

    /// Serialize the schema to a JSON Value, or `None` if any part is invalid.
    pub fn to_json_value(&self) -> Option<Value> {
        match self {
            AvroSchema::Primitive(p) => Some(json!(p.name())),
            AvroSchema::Array(items) => Some(json!({
                "type": "array",
                "items": items.to_json_value()?,
            })),
            AvroSchema::Map(values) => Some(json!({
                "type": "map",
                "values": values.to_json_value()?,
            })),
            AvroSchema::Union(members) => members
                .iter()
                .map(AvroSchema::to_json_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            AvroSchema::Fixed(f) => Some(json!({
                "type": "fixed",
                "name": &f.name,
                "size": f.size,
            })),
            AvroSchema::Enum(e) => Some(json!({
                "type": "enum",
                "name": &e.name,
                "symbols": &e.symbols,
            })),
            AvroSchema::Record(r) => r.to_json_value(),
            AvroSchema::Invalid => None,
        }
    }
}
