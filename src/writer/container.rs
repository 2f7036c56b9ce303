//! Object Container File writer
//!
//! Records are encoded into an in-memory block and written out as framed
//! blocks once the block grows near the configured size. The sink is opened,
//! and the header written, only when the first block (or `close`) needs it.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;

use rand::RngCore;
use tracing::{debug, info, warn};

use crate::error::WriterError;
use crate::reader::{AvroBlock, AvroHeader, RESERVED_PREFIX, SYNC_MARKER_SIZE};
use crate::schema::AvroSchema;
use crate::value::AvroValue;

use super::sink::{Output, Sink};
use super::Encoder;

/// Upper bound on the block buffer reserved up front.
const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Configuration for the ContainerWriter.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Target block size in bytes (default: 100,000).
    pub block_size: usize,
    /// Extra header metadata. Keys starting with `avro.` are reserved.
    pub metadata: BTreeMap<String, Vec<u8>>,
    /// Create missing parent directories for file sinks (default: true).
    pub create_dirs: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            block_size: 100_000,
            metadata: BTreeMap::new(),
            create_dirs: true,
        }
    }
}

impl WriterConfig {
    /// Create a new WriterConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size threshold in bytes.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Add a header metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set whether missing parent directories are created.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}

/// Writer for Avro Object Container Files.
///
/// Dropping an open writer closes it; failures at that point are logged.
///
/// A failed write to the sink closes the writer and discards the buffered
/// block, so nothing is written after a partial frame.
///
/// # Example
/// ```
/// use contrail::schema::parse_schema;
/// use contrail::writer::{ContainerWriter, Sink, WriterConfig};
/// use contrail::AvroValue;
///
/// let schema = parse_schema(r#"{"type": "array", "items": "long"}"#);
/// let mut writer = ContainerWriter::new(schema, Sink::memory(), WriterConfig::new())?;
/// writer.append(&AvroValue::Array(vec![AvroValue::Long(3)]))?;
/// writer.close()?;
/// assert_eq!(writer.object_count(), 1);
/// assert!(writer.memory_bytes().is_some());
/// # Ok::<(), contrail::error::WriterError>(())
/// ```
#[derive(Debug)]
pub struct ContainerWriter {
    schema: Arc<AvroSchema>,
    schema_json: String,
    sink: Sink,
    config: WriterConfig,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    encoder: Option<Encoder>,
    output: Option<Output>,
    block_object_count: usize,
    object_count: u64,
    bytes_written: u64,
    largest_record_size: usize,
    closed: bool,
}

impl ContainerWriter {
    /// Create a writer with a sync marker from the thread-local RNG.
    ///
    /// # Errors
    /// - `WriterError::InvalidSchema` if the schema is `Invalid` or contains it
    /// - `WriterError::ReservedMetadata` if the config sets an `avro.` key
    /// - `WriterError::SchemaJson` if the schema cannot be rendered
    pub fn new(
        schema: impl Into<Arc<AvroSchema>>,
        sink: Sink,
        config: WriterConfig,
    ) -> Result<Self, WriterError> {
        Self::with_rng(schema, sink, config, &mut rand::thread_rng())
    }

    /// Create a writer drawing its sync marker from `rng`.
    pub fn with_rng<R: RngCore + ?Sized>(
        schema: impl Into<Arc<AvroSchema>>,
        sink: Sink,
        config: WriterConfig,
        rng: &mut R,
    ) -> Result<Self, WriterError> {
        let schema = schema.into();
        if !schema.is_valid() {
            return Err(WriterError::InvalidSchema);
        }
        if let Some(key) = config
            .metadata
            .keys()
            .find(|key| key.starts_with(RESERVED_PREFIX))
        {
            return Err(WriterError::ReservedMetadata(key.clone()));
        }
        let schema_json = schema.to_json()?;

        let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
        rng.fill_bytes(&mut sync_marker);

        Ok(Self {
            schema,
            schema_json,
            sink,
            config,
            sync_marker,
            encoder: None,
            output: None,
            block_object_count: 0,
            object_count: 0,
            bytes_written: 0,
            largest_record_size: 0,
            closed: false,
        })
    }

    /// The writer schema.
    pub fn schema(&self) -> &Arc<AvroSchema> {
        &self.schema
    }

    /// The schema JSON stored in the header.
    pub fn schema_json(&self) -> &str {
        &self.schema_json
    }

    /// The sync marker written after every block.
    pub fn sync_marker(&self) -> &[u8; SYNC_MARKER_SIZE] {
        &self.sync_marker
    }

    /// Records appended so far, including those still buffered.
    pub fn object_count(&self) -> u64 {
        self.object_count
    }

    /// Records buffered in the current block.
    pub fn block_object_count(&self) -> usize {
        self.block_object_count
    }

    /// Bytes written to the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Largest single encoded record seen so far.
    pub fn largest_record_size(&self) -> usize {
        self.largest_record_size
    }

    /// Whether the writer is closed, by `close` or by a failed sink write.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes written so far, for an in-memory sink.
    pub fn memory_bytes(&self) -> Option<&[u8]> {
        self.output.as_ref().and_then(Output::memory_bytes)
    }

    /// Close the writer and take the bytes of an in-memory sink.
    ///
    /// Returns `Ok(None)` for file sinks.
    pub fn into_memory_bytes(mut self) -> Result<Option<Vec<u8>>, WriterError> {
        self.close()?;
        match self.output.take() {
            Some(Output::Memory(bytes)) => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }

    /// Encode and buffer one record.
    ///
    /// If the value fails to encode, nothing is buffered and the counters are
    /// unchanged. If writing the now full block fails, the record was already
    /// counted; the writer closes, so a retry returns `WriterError::Closed`
    /// instead of writing the record twice.
    ///
    /// # Errors
    /// - `WriterError::Closed` after `close` or a failed sink write
    /// - `WriterError::EncodeRecord` if the value doesn't match the schema
    /// - Any sink error from writing a full block
    pub fn append(&mut self, value: &AvroValue) -> Result<(), WriterError> {
        if self.closed {
            return Err(WriterError::Closed);
        }

        let encoder = self
            .encoder
            .get_or_insert_with(|| {
                Encoder::with_capacity(self.config.block_size.min(MAX_INITIAL_CAPACITY))
            });

        encoder.checkpoint();
        if let Err(e) = value.encode(encoder, &self.schema) {
            encoder.revert();
            return Err(WriterError::EncodeRecord(e));
        }
        let record_size = encoder.len() - encoder.checkpoint_len();
        let buffered = encoder.len();

        self.block_object_count += 1;
        self.object_count += 1;
        self.largest_record_size = self.largest_record_size.max(record_size);

        if buffered + self.largest_record_size > self.config.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the current block, if it holds any records.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        if self.block_object_count == 0 {
            if let Some(encoder) = self.encoder.as_mut() {
                encoder.clear();
            }
            return Ok(());
        }

        self.open_output()?;

        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        let frame = AvroBlock::encode(self.block_object_count, encoder.as_bytes(), &self.sync_marker);
        encoder.clear();
        if let Some(Err(e)) = self.output.as_mut().map(|output| output.write_all(&frame)) {
            return Err(self.fail(e));
        }

        debug!(
            records = self.block_object_count,
            bytes = frame.len(),
            "Wrote block"
        );
        self.bytes_written += frame.len() as u64;
        self.block_object_count = 0;
        Ok(())
    }

    /// Write any pending block and close the sink.
    ///
    /// A writer that never wrote a block still emits the header, so the
    /// output is a valid empty container. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), WriterError> {
        if self.closed {
            return Ok(());
        }

        self.flush()?;
        self.open_output()?;
        if let Some(Err(e)) = self.output.as_mut().map(Output::flush) {
            return Err(self.fail(e));
        }
        if self.output.as_ref().is_some_and(Output::is_file) {
            self.output = None;
        }
        self.encoder = None;
        self.closed = true;

        info!(
            records = self.object_count,
            bytes = self.bytes_written,
            "Closed container writer"
        );
        Ok(())
    }

    /// Close, logging instead of returning any failure.
    pub fn try_close(&mut self) -> bool {
        match self.close() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to close container writer");
                false
            }
        }
    }

    /// Open the sink and write the header, once.
    fn open_output(&mut self) -> Result<(), WriterError> {
        if self.output.is_some() {
            return Ok(());
        }

        let header = AvroHeader::encode(&self.schema_json, &self.config.metadata, &self.sync_marker)
            .map_err(WriterError::EncodeHeader)?;
        let mut output = self.sink.open(self.config.create_dirs)?;
        if let Err(e) = output.write_all(&header) {
            self.output = Some(output);
            return Err(self.fail(e));
        }

        self.bytes_written += header.len() as u64;
        self.output = Some(output);
        debug!(sink = ?self.sink, bytes = header.len(), "Wrote container header");
        Ok(())
    }
}

impl ContainerWriter {
    /// Close after a sink write error, dropping the buffered block and any
    /// bytes still held for a file without flushing them.
    fn fail(&mut self, error: io::Error) -> WriterError {
        warn!(
            error = %error,
            discarded_records = self.block_object_count,
            "Sink write failed, closing container writer"
        );
        self.closed = true;
        self.encoder = None;
        self.block_object_count = 0;
        match self.output.take() {
            Some(Output::File(writer)) => {
                let (_file, _unwritten) = writer.into_parts();
            }
            other => self.output = other,
        }
        WriterError::Write(error)
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        self.try_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{parse_schema, EnumSchema, Primitive};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn long_writer(block_size: usize) -> ContainerWriter {
        ContainerWriter::with_rng(
            AvroSchema::Primitive(Primitive::Long),
            Sink::memory(),
            WriterConfig::new().with_block_size(block_size),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_schema() {
        let schema = parse_schema(r#"{"type": "record", "name": "R", "fields": [{"type": "int"}]}"#);
        assert!(matches!(
            ContainerWriter::new(schema, Sink::memory(), WriterConfig::new()),
            Err(WriterError::InvalidSchema)
        ));
    }

    #[test]
    fn test_sync_marker_from_injected_rng() {
        let a = long_writer(100);
        let b = long_writer(100);
        assert_eq!(a.sync_marker(), b.sync_marker());
    }

    #[test]
    fn test_nothing_written_until_first_block() {
        let mut writer = long_writer(1_000);
        writer.append(&AvroValue::Long(1)).unwrap();
        assert_eq!(writer.bytes_written(), 0);
        assert!(writer.memory_bytes().is_none());
        assert_eq!(writer.block_object_count(), 1);
    }

    #[test]
    fn test_block_flushes_on_threshold() {
        // each record encodes to 2 bytes
        let mut writer = long_writer(5);
        writer.append(&AvroValue::Long(100)).unwrap();
        assert_eq!(writer.block_object_count(), 1);
        writer.append(&AvroValue::Long(100)).unwrap();
        assert_eq!(writer.block_object_count(), 0);
        assert_eq!(writer.largest_record_size(), 2);
        assert_eq!(writer.object_count(), 2);
        assert!(writer.bytes_written() > 0);
    }

    #[test]
    fn test_failed_append_leaves_counters() {
        let mut writer = long_writer(1_000);
        writer.append(&AvroValue::Long(5)).unwrap();
        let err = writer.append(&AvroValue::String("x".into())).unwrap_err();
        assert!(matches!(err, WriterError::EncodeRecord(_)));
        assert_eq!(writer.object_count(), 1);
        assert_eq!(writer.block_object_count(), 1);
        writer.flush().unwrap();
        let bytes = writer.memory_bytes().unwrap();
        // block payload is the single committed record: count 1, size 1, 0x0A
        let sync = *writer.sync_marker();
        let tail = &bytes[bytes.len() - 19..];
        assert_eq!(&tail[..3], &[0x02, 0x02, 0x0A]);
        assert_eq!(&tail[3..], &sync);
    }

    #[test]
    fn test_close_empty_writer_emits_header() {
        let mut writer = long_writer(1_000);
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(writer.bytes_written() > 0);
        assert_eq!(&writer.memory_bytes().unwrap()[..4], b"Obj\x01");
        assert!(matches!(
            writer.append(&AvroValue::Long(1)),
            Err(WriterError::Closed)
        ));
        writer.close().unwrap();
    }

    #[test]
    fn test_into_memory_bytes() {
        let mut writer = long_writer(1_000);
        writer.append(&AvroValue::Long(1)).unwrap();
        let bytes = writer.into_memory_bytes().unwrap().unwrap();
        assert_eq!(&bytes[..4], b"Obj\x01");
    }

    #[test]
    fn test_rejects_reserved_metadata() {
        for key in ["avro.codec", "avro.schema", "avro.custom"] {
            let config = WriterConfig::new().with_metadata(key, "deflate");
            match ContainerWriter::new(AvroSchema::Primitive(Primitive::Int), Sink::memory(), config) {
                Err(WriterError::ReservedMetadata(reserved)) => assert_eq!(reserved, key),
                other => panic!("expected ReservedMetadata, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_enum_with_repeated_symbols() {
        let schema = AvroSchema::Enum(EnumSchema::new("E", vec!["a".into(), "a".into()]));
        assert!(matches!(
            ContainerWriter::new(schema, Sink::memory(), WriterConfig::new()),
            Err(WriterError::InvalidSchema)
        ));
    }

    #[test]
    fn test_huge_block_size_does_not_preallocate() {
        let mut writer = long_writer(usize::MAX);
        writer.append(&AvroValue::Long(1)).unwrap();
        assert_eq!(writer.block_object_count(), 1);
        let bytes = writer.into_memory_bytes().unwrap().unwrap();
        assert_eq!(&bytes[..4], b"Obj\x01");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_sink_write_closes_writer() {
        let full = std::path::Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let mut writer = ContainerWriter::with_rng(
            AvroSchema::Primitive(Primitive::String),
            Sink::file(full),
            WriterConfig::new().with_block_size(1).with_create_dirs(false),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap();

        // larger than the file buffer, so the frame reaches the device
        let big = AvroValue::String("x".repeat(64 * 1024));
        assert!(matches!(writer.append(&big), Err(WriterError::Write(_))));
        assert!(writer.is_closed());
        assert_eq!(writer.object_count(), 1);
        assert_eq!(writer.block_object_count(), 0);

        assert!(matches!(writer.append(&big), Err(WriterError::Closed)));
        writer.flush().unwrap();
        writer.close().unwrap();
        assert!(writer.try_close());
    }

    #[test]
    fn test_config_builder() {
        let config = WriterConfig::new()
            .with_block_size(64)
            .with_metadata("app", "contrail")
            .with_create_dirs(false);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.metadata.get("app").map(Vec::as_slice), Some(&b"contrail"[..]));
        assert!(!config.create_dirs);
    }
}
