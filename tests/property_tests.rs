//! Property-based tests for contrail.
//!
//! These tests use proptest to check round-trip properties across generated
//! schemas and values, over both in-memory and streaming sources.

use std::io::Cursor;

use proptest::prelude::*;
use proptest::strategy::Union;

use contrail::reader::{encode_zigzag, varint::decode_zigzag, ContainerReader};
use contrail::schema::*;
use contrail::source::{ReadSource, SliceSource};
use contrail::writer::{ContainerWriter, Sink, WriterConfig};
use contrail::AvroValue;

// ============================================================================
// Schema Generators
// ============================================================================

/// Generate arbitrary Avro primitive schemas.
fn arb_primitive_schema() -> impl Strategy<Value = AvroSchema> {
    prop_oneof![
        Just(Primitive::Null),
        Just(Primitive::Boolean),
        Just(Primitive::Int),
        Just(Primitive::Long),
        Just(Primitive::Float),
        Just(Primitive::Double),
        Just(Primitive::Bytes),
        Just(Primitive::String),
    ]
    .prop_map(AvroSchema::Primitive)
}

/// Generate a fixed schema.
fn arb_fixed_schema() -> impl Strategy<Value = AvroSchema> {
    (0usize..12).prop_map(|size| AvroSchema::Fixed(FixedSchema::new(format!("Fixed{}", size), size)))
}

/// Generate an enum schema with distinct symbols.
fn arb_enum_schema() -> impl Strategy<Value = AvroSchema> {
    (1usize..6).prop_map(|count| {
        let symbols = (0..count).map(|i| format!("S{}", i)).collect();
        AvroSchema::Enum(EnumSchema::new("Symbol", symbols))
    })
}

/// Generate schemas of every shape, nested a few levels deep.
fn arb_avro_schema() -> impl Strategy<Value = AvroSchema> {
    let leaf = prop_oneof![
        4 => arb_primitive_schema(),
        1 => arb_fixed_schema(),
        1 => arb_enum_schema(),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|items| AvroSchema::Array(Box::new(items))),
            inner.clone().prop_map(|values| AvroSchema::Map(Box::new(values))),
            inner.clone().prop_map(|member| match member {
                AvroSchema::Union(members) => AvroSchema::Union(members),
                member => AvroSchema::Union(vec![Primitive::Null.into(), member]),
            }),
            prop::collection::vec(inner, 1..4).prop_map(|schemas| {
                let fields = schemas
                    .into_iter()
                    .enumerate()
                    .map(|(i, schema)| FieldSchema::new(format!("f{}", i), schema))
                    .collect();
                AvroSchema::Record(RecordSchema::new("Rec", fields))
            }),
        ]
    })
}

// ============================================================================
// Value Generators
// ============================================================================

/// Generate a value that is legal under `schema`.
fn arb_value(schema: &AvroSchema) -> BoxedStrategy<AvroValue> {
    match schema {
        AvroSchema::Primitive(Primitive::Null) | AvroSchema::Invalid => Just(AvroValue::Null).boxed(),
        AvroSchema::Primitive(Primitive::Boolean) => any::<bool>().prop_map(AvroValue::Boolean).boxed(),
        AvroSchema::Primitive(Primitive::Int) => any::<i32>().prop_map(AvroValue::Int).boxed(),
        AvroSchema::Primitive(Primitive::Long) => any::<i64>().prop_map(AvroValue::Long).boxed(),
        AvroSchema::Primitive(Primitive::Float) => (-1.0e6f32..1.0e6f32).prop_map(AvroValue::Float).boxed(),
        AvroSchema::Primitive(Primitive::Double) => {
            (-1.0e12f64..1.0e12f64).prop_map(AvroValue::Double).boxed()
        }
        AvroSchema::Primitive(Primitive::Bytes) => prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(AvroValue::Bytes)
            .boxed(),
        AvroSchema::Primitive(Primitive::String) => ".{0,16}".prop_map(AvroValue::String).boxed(),
        AvroSchema::Fixed(fixed) => prop::collection::vec(any::<u8>(), fixed.size)
            .prop_map(AvroValue::Fixed)
            .boxed(),
        AvroSchema::Enum(e) => {
            let symbols = e.symbols.clone();
            (0..symbols.len())
                .prop_map(move |index| AvroValue::Enum {
                    symbol: symbols[index].clone(),
                    index,
                })
                .boxed()
        }
        AvroSchema::Array(items) => prop::collection::vec(arb_value(items), 0..4)
            .prop_map(AvroValue::Array)
            .boxed(),
        AvroSchema::Map(values) => prop::collection::btree_map("[a-z]{0,6}", arb_value(values), 0..4)
            .prop_map(AvroValue::Map)
            .boxed(),
        AvroSchema::Union(members) => Union::new(members.iter().map(arb_value)).boxed(),
        AvroSchema::Record(record) => {
            let names: Vec<String> = record.fields.iter().map(|f| f.name.clone()).collect();
            let values: Vec<_> = record.fields.iter().map(|f| arb_value(&f.schema)).collect();
            values
                .prop_map(move |values| AvroValue::record(names.clone().into_iter().zip(values)))
                .boxed()
        }
    }
}

/// Generate a schema together with a legal value.
fn arb_schema_and_value() -> impl Strategy<Value = (AvroSchema, AvroValue)> {
    arb_avro_schema().prop_flat_map(|schema| {
        let value = arb_value(&schema);
        (Just(schema), value)
    })
}

/// Generate a schema together with several legal values.
fn arb_schema_and_values() -> impl Strategy<Value = (AvroSchema, Vec<AvroValue>)> {
    arb_avro_schema().prop_flat_map(|schema| {
        let values = prop::collection::vec(arb_value(&schema), 0..40);
        (Just(schema), values)
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Decoding an encoded value yields the value again, from either source.
    #[test]
    fn prop_value_round_trip((schema, value) in arb_schema_and_value()) {
        let bytes = value.to_avro_bytes(&schema).unwrap();

        let mut slice = SliceSource::new(&bytes);
        let from_slice = contrail::Decoder::new(&mut slice).decode_value(&schema).unwrap();
        prop_assert!(slice.is_empty(), "{} trailing bytes", slice.len());

        let from_stream = AvroValue::from_reader(Cursor::new(bytes.clone()), &schema).unwrap();

        prop_assert_eq!(&from_slice, &value);
        prop_assert_eq!(&from_stream, &value);
    }

    /// Any prefix of an encoding decodes the same way from either source,
    /// and never panics.
    #[test]
    fn prop_truncated_input_agrees_across_sources(
        (schema, value) in arb_schema_and_value(),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = value.to_avro_bytes(&schema).unwrap();
        let prefix = &bytes[..cut.index(bytes.len() + 1)];

        let from_slice = AvroValue::from_avro_bytes(prefix, &schema).ok();
        let from_stream = AvroValue::from_reader(Cursor::new(prefix.to_vec()), &schema).ok();
        prop_assert_eq!(from_slice, from_stream);
    }

    /// Rendering a schema to JSON and parsing it again gives an equal schema.
    #[test]
    fn prop_schema_json_round_trip(schema in arb_avro_schema()) {
        let json = schema.to_json().unwrap();
        prop_assert_eq!(parse_schema(&json), schema);
    }

    /// Zigzag varints survive a round trip through the stream source.
    #[test]
    fn prop_zigzag_round_trip(value in any::<i64>()) {
        let bytes = encode_zigzag(value);
        prop_assert!(bytes.len() <= 10);
        let mut stream = ReadSource::new(Cursor::new(bytes));
        prop_assert_eq!(decode_zigzag(&mut stream).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Containers return every appended record in order, whatever the block size.
    #[test]
    fn prop_container_round_trip(
        (schema, values) in arb_schema_and_values(),
        block_size in 1usize..512,
    ) {
        let mut writer = ContainerWriter::new(
            schema.clone(),
            Sink::memory(),
            WriterConfig::new().with_block_size(block_size),
        ).unwrap();
        for value in &values {
            writer.append(value).unwrap();
        }
        prop_assert_eq!(writer.object_count(), values.len() as u64);
        let bytes = writer.into_memory_bytes().unwrap().unwrap();

        let mut reader = ContainerReader::from_bytes(&bytes).unwrap();
        prop_assert_eq!(&**reader.schema(), &schema);
        prop_assert_eq!(reader.read_all().unwrap(), values.clone());

        let streamed = ContainerReader::from_reader(Cursor::new(bytes))
            .unwrap()
            .read_all()
            .unwrap();
        prop_assert_eq!(streamed, values);
    }
}
