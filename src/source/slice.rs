//! In-memory byte source
//!
//! A shrinking view over a borrowed buffer. Each read advances the view;
//! a read that asks for more than remains fails without consuming anything.

use super::traits::ByteSource;
use crate::error::DecodeError;

/// A byte source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    remaining: &'a [u8],
}

impl<'a> SliceSource<'a> {
    /// Create a source over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }

    /// The bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        self.remaining
    }

    /// Number of bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    /// Check if every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Take `len` bytes without copying.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining.len() < len {
            return Err(DecodeError::UnexpectedEof);
        }
        let (head, tail) = self.remaining.split_at(len);
        self.remaining = tail;
        Ok(head)
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        let bytes = self.take(buf.len())?;
        buf.copy_from_slice(bytes);
        Ok(())
    }

    fn is_exhausted(&mut self) -> Result<bool, DecodeError> {
        Ok(self.remaining.is_empty())
    }

    #[inline]
    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let (&byte, tail) = self
            .remaining
            .split_first()
            .ok_or(DecodeError::UnexpectedEof)?;
        self.remaining = tail;
        Ok(byte)
    }

    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        self.take(len).map(<[u8]>::to_vec)
    }
}
