//! Avro container writing
//!
//! The [`Encoder`] produces raw Avro binary; [`ContainerWriter`] frames
//! encoded records into an Object Container File on a [`Sink`].

mod container;
mod encoder;
mod sink;

pub use container::{ContainerWriter, WriterConfig};
pub use encoder::Encoder;
pub use sink::Sink;
