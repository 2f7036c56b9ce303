//! ByteSource trait definition
//!
//! Provides one blocking "read exactly N bytes" interface over in-memory
//! buffers and pull-based streams. All decoding is written against it.

use crate::error::DecodeError;

/// Abstraction over the bytes a decoder consumes.
///
/// Implementations must either fill the whole request or fail; a failed
/// read leaves the decoder's value undefined but never returns partial data.
pub trait ByteSource {
    /// Fill `buf` completely from the source.
    ///
    /// # Errors
    /// - `DecodeError::UnexpectedEof` if the source ends first
    /// - `DecodeError::Io` if a streaming source fails
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError>;

    /// Check whether the source has no more bytes.
    ///
    /// Streaming sources may block until at least one byte is available.
    fn is_exhausted(&mut self) -> Result<bool, DecodeError>;

    /// Read a single byte.
    #[inline]
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let mut byte = [0u8; 1];
        self.read_exact_into(&mut byte)?;
        Ok(byte[0])
    }

    /// Read exactly `len` bytes into a new vector.
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buf = vec![0u8; len];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-size array.
    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError>
    where
        Self: Sized,
    {
        let mut buf = [0u8; N];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        (**self).read_exact_into(buf)
    }

    fn is_exhausted(&mut self) -> Result<bool, DecodeError> {
        (**self).is_exhausted()
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        (**self).read_vec(len)
    }
}

/// A boxed ByteSource for dynamic dispatch
pub type BoxedSource<'a> = Box<dyn ByteSource + 'a>;

impl ByteSource for BoxedSource<'_> {
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        (**self).read_exact_into(buf)
    }

    fn is_exhausted(&mut self) -> Result<bool, DecodeError> {
        (**self).is_exhausted()
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        (**self).read_vec(len)
    }
}
