//! Pull-based stream source
//!
//! Wraps any blocking `std::io::Read` (file, socket, pipe) in a buffered
//! reader. Reads block until satisfied or the stream ends.

use std::io::{self, BufRead, BufReader, Read};

use super::traits::ByteSource;
use crate::error::DecodeError;

/// Largest chunk allocated up front for a length-prefixed read, so a corrupt
/// length cannot force a huge allocation before the stream runs dry.
const MAX_PREALLOCATION: usize = 64 * 1024;

/// A byte source over a blocking reader.
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    inner: BufReader<R>,
}

impl<R: Read> ReadSource<R> {
    /// Create a source over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
        }
    }

    /// Create a source with a specific buffer capacity.
    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, reader),
        }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Unwrap the underlying reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

fn map_io(e: io::Error) -> DecodeError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof
    } else {
        DecodeError::Io(e)
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.inner.read_exact(buf).map_err(map_io)
    }

    fn is_exhausted(&mut self) -> Result<bool, DecodeError> {
        Ok(self.inner.fill_buf().map_err(map_io)?.is_empty())
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        let read = (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(map_io)?;
        if read < len {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(buf)
    }
}
