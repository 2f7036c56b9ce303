//! Byte sources for decoding
//!
//! This module provides the single abstraction every decoder reads from,
//! with an in-memory implementation and a blocking stream implementation.
//! Decoding behaves identically over either.

mod slice;
mod stream;
mod traits;

pub use slice::SliceSource;
pub use stream::ReadSource;
pub use traits::{BoxedSource, ByteSource};
