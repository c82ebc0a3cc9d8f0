//! QDataStream binary encoding of QVariant values.
//!
//! Every top-level value is written as a 4-byte big-endian type tag, a
//! one-byte null indicator (always 0 here) and a type-specific payload. All
//! multi-byte integers are big-endian.

pub mod calendar;
pub mod reader;
pub mod text;
pub mod writer;

pub use reader::{decoder_for, DecodeFn, Reader};
pub use writer::Writer;

/// Length prefix marking a null QString or QByteArray.
pub const NULL_LENGTH: u32 = 0xFFFF_FFFF;
