//! Output sinks for the container writer
//!
//! A [`Sink`] names where a container goes; it is opened lazily by the
//! writer, right before the header is written.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::WriterError;

const FILE_SCHEME: &str = "file://";
const MEMORY_LOCATION: &str = "memory:";

/// Destination of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// A file on the local filesystem
    File(PathBuf),
    /// An in-memory buffer, retrieved from the writer
    Memory,
}

impl Sink {
    /// A file sink at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Sink::File(path.as_ref().to_path_buf())
    }

    /// An in-memory sink.
    pub fn memory() -> Self {
        Sink::Memory
    }

    /// Resolve a location string.
    ///
    /// Plain paths and `file://` URIs are files; `memory:` is an in-memory
    /// buffer.
    ///
    /// # Errors
    /// `WriterError::UnsupportedSink` for any other `scheme://` location.
    pub fn from_location(location: &str) -> Result<Self, WriterError> {
        if location == MEMORY_LOCATION {
            return Ok(Sink::Memory);
        }
        if let Some(path) = location.strip_prefix(FILE_SCHEME) {
            return Ok(Sink::file(path));
        }
        if location.contains("://") || location.is_empty() {
            return Err(WriterError::UnsupportedSink(location.to_string()));
        }
        Ok(Sink::file(location))
    }

    /// Open the sink for writing, creating parent directories if asked.
    pub(crate) fn open(&self, create_dirs: bool) -> Result<Output, WriterError> {
        match self {
            Sink::Memory => Ok(Output::Memory(Vec::new())),
            Sink::File(path) => {
                if create_dirs {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent).map_err(|source| {
                            WriterError::CreateDirectory {
                                path: parent.to_path_buf(),
                                source,
                            }
                        })?;
                    }
                }
                let file = File::create(path).map_err(|source| WriterError::CreateFile {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "Created container file");
                Ok(Output::File(BufWriter::new(file)))
            }
        }
    }
}

/// An opened sink.
#[derive(Debug)]
pub(crate) enum Output {
    File(BufWriter<File>),
    Memory(Vec<u8>),
}

impl Output {
    pub(crate) fn memory_bytes(&self) -> Option<&[u8]> {
        match self {
            Output::Memory(bytes) => Some(bytes),
            Output::File(_) => None,
        }
    }

    pub(crate) fn is_file(&self) -> bool {
        matches!(self, Output::File(_))
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::File(file) => file.write(buf),
            Output::Memory(bytes) => bytes.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Output::File(file) => file.write_all(buf),
            Output::Memory(bytes) => bytes.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::File(file) => file.flush(),
            Output::Memory(_) => Ok(()),
        }
    }
}
