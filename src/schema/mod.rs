//! Avro schema types and parsing.
//!
//! This module defines the Avro schema tree (primitives, arrays, maps,
//! unions, records, enums, fixed) and its JSON parser and renderer.

mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_bytes, parse_schema_value};
pub use types::*;
