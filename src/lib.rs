//! qdatastream: a pure-Rust QDataStream QVariant codec.
//!
//! This crate reads and writes the self-describing QVariant binary format
//! used by Qt peers, such as the control protocol spoken by Quassel-style
//! IRC cores. Values are encoded bit-exactly, including null versus empty
//! strings, UTF-16 surrogate pairs and the QTime/QDateTime encodings.
//!
//! # Architecture
//!
//! - **`types`**: `TypeTag`, the typed `Variant` tree and loosely typed `Native` values
//! - **`datastream`**: `Reader`/`Writer`, UTF-16 transcoding and calendar encodings
//! - **`user_type`**: registry of caller-supplied codecs for QUserType payloads
//! - **`config`**: decode limits, calendar offset and transcoding mode
//! - **`frame`**: 4-byte length-prefixed message framing over tokio streams
//!   (feature `framing`, on by default)

pub mod config;
pub mod datastream;
pub mod error;
pub mod types;
pub mod user_type;

#[cfg(feature = "framing")]
pub mod frame;

pub use config::{Options, Transcoding};
pub use datastream::{Reader, Writer};
pub use error::{DataStreamError, Result};
pub use types::{Native, TypeTag, UserValue, Variant, VariantList, VariantMap};
pub use user_type::{FnCodec, UserTypeCodec, UserTypeRegistry};
