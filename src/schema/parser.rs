//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into the `AvroSchema` tree by recursive descent
//! keyed on a dispatch key (initially `"type"`). Parsing never raises: any
//! structural mismatch yields `AvroSchema::Invalid`, which propagates by
//! value through every enclosing array, map, union and record.

use std::collections::HashSet;

use serde_json::Value;

use crate::schema::{AvroSchema, EnumSchema, FieldSchema, FixedSchema, RecordSchema, TypeTag};

/// Key under which a type name (or nested type object) is looked up.
const TYPE_KEY: &str = "type";

/// Parse an Avro schema from a JSON string.
///
/// Malformed JSON and malformed schemas both produce `AvroSchema::Invalid`;
/// check `is_valid()` before use.
///
/// # Example
/// ```
/// use contrail::schema::{parse_schema, AvroSchema, Primitive};
///
/// let schema = parse_schema(r#"{"type": "array", "items": "long"}"#);
/// assert_eq!(
///     schema,
///     AvroSchema::Array(Box::new(AvroSchema::Primitive(Primitive::Long)))
/// );
/// assert!(!parse_schema(r#"{"type": "array"}"#).is_valid());
/// ```
pub fn parse_schema(json: &str) -> AvroSchema {
    parse_schema_bytes(json.as_bytes())
}

/// Parse an Avro schema from raw JSON bytes.
pub fn parse_schema_bytes(json: &[u8]) -> AvroSchema {
    match serde_json::from_slice::<Value>(json) {
        Ok(value) => parse_schema_value(&value),
        Err(e) => {
            tracing::debug!(error = %e, "schema is not valid JSON");
            AvroSchema::Invalid
        }
    }
}

/// Parse an Avro schema from a pre-parsed JSON document.
///
/// The document is usually an object carrying a `"type"` key. A bare
/// primitive name or a union array is accepted as well.
pub fn parse_schema_value(value: &Value) -> AvroSchema {
    match value {
        Value::Object(_) => parse_at(value, TYPE_KEY),
        Value::Array(members) => parse_union(members),
        Value::String(_) => parse_union_member(value),
        _ => AvroSchema::Invalid,
    }
}

/// Parse the schema found under `key` in the JSON object `json`.
fn parse_at(json: &Value, key: &str) -> AvroSchema {
    match json.get(key) {
        Some(Value::String(type_name)) => parse_type_name(json, key, type_name),
        // A nested type object: recurse into it at its own "type" key.
        Some(nested @ Value::Object(_)) => parse_at(nested, TYPE_KEY),
        Some(Value::Array(members)) => parse_union(members),
        _ => AvroSchema::Invalid,
    }
}

/// Resolve a type name found under `key`.
///
/// Complex type names take their attributes from the same object, so they
/// are only meaningful at the `"type"` key; anywhere else (`"items"`,
/// `"values"`) only primitive names are accepted.
fn parse_type_name(json: &Value, key: &str, type_name: &str) -> AvroSchema {
    let tag = TypeTag::from_name(type_name);
    match tag {
        TypeTag::Primitive(p) => AvroSchema::Primitive(p),
        TypeTag::Invalid => AvroSchema::Invalid,
        _ if key != TYPE_KEY => AvroSchema::Invalid,
        TypeTag::Array => match parse_at(json, "items") {
            AvroSchema::Invalid => AvroSchema::Invalid,
            items => AvroSchema::Array(Box::new(items)),
        },
        TypeTag::Map => match parse_at(json, "values") {
            AvroSchema::Invalid => AvroSchema::Invalid,
            values => AvroSchema::Map(Box::new(values)),
        },
        TypeTag::Record => parse_record(json),
        TypeTag::Enum => parse_enum(json),
        TypeTag::Fixed => parse_fixed(json),
    }
}

/// Parse a union from the members of a JSON array.
///
/// A single invalid member (including a nested union) invalidates the
/// whole union.
fn parse_union(members: &[Value]) -> AvroSchema {
    let mut schemas = Vec::with_capacity(members.len());
    for member in members {
        match parse_union_member(member) {
            AvroSchema::Invalid => return AvroSchema::Invalid,
            schema => schemas.push(schema),
        }
    }
    AvroSchema::Union(schemas)
}

fn parse_union_member(member: &Value) -> AvroSchema {
    match member {
        Value::String(name) => match TypeTag::from_name(name) {
            TypeTag::Primitive(p) => AvroSchema::Primitive(p),
            _ => AvroSchema::Invalid,
        },
        // Unions may not directly contain unions.
        Value::Array(_) => AvroSchema::Invalid,
        Value::Object(_) => parse_at(member, TYPE_KEY),
        _ => AvroSchema::Invalid,
    }
}

/// Named types must carry a non-empty string name.
fn required_name(json: &Value) -> Option<&str> {
    json.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

fn parse_record(json: &Value) -> AvroSchema {
    let Some(name) = required_name(json) else {
        return AvroSchema::Invalid;
    };
    let Some(fields) = json.get("fields").and_then(Value::as_array) else {
        return AvroSchema::Invalid;
    };

    let mut parsed = Vec::with_capacity(fields.len());
    for field in fields {
        // The first bad field aborts the whole record.
        let Some(field_name) = field.get("name").and_then(Value::as_str) else {
            return AvroSchema::Invalid;
        };
        match parse_at(field, TYPE_KEY) {
            AvroSchema::Invalid => return AvroSchema::Invalid,
            schema => parsed.push(FieldSchema::new(field_name, schema)),
        }
    }

    AvroSchema::Record(RecordSchema::new(name, parsed))
}

fn parse_enum(json: &Value) -> AvroSchema {
    let Some(name) = required_name(json) else {
        return AvroSchema::Invalid;
    };
    let Some(symbols) = json.get("symbols").and_then(Value::as_array) else {
        return AvroSchema::Invalid;
    };

    let mut seen = HashSet::with_capacity(symbols.len());
    let mut parsed = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let Some(symbol) = symbol.as_str() else {
            return AvroSchema::Invalid;
        };
        if !seen.insert(symbol) {
            return AvroSchema::Invalid;
        }
        parsed.push(symbol.to_string());
    }

    AvroSchema::Enum(EnumSchema::new(name, parsed))
}

fn parse_fixed(json: &Value) -> AvroSchema {
    let Some(name) = required_name(json) else {
        return AvroSchema::Invalid;
    };
    match json
        .get("size")
        .and_then(Value::as_u64)
        .and_then(|size| usize::try_from(size).ok())
    {
        Some(size) => AvroSchema::Fixed(FixedSchema::new(name, size)),
        None => AvroSchema::Invalid,
    }
}
