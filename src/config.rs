//! Codec options shared by [`Reader`](crate::datastream::Reader) and
//! [`Writer`](crate::datastream::Writer).

use chrono::{FixedOffset, Offset, Utc};

/// Default maximum nesting of lists, maps and user types.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum declared element count of a single container.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1 << 20;

/// How text is transcoded to and from UTF-16BE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transcoding {
    /// Full Unicode, surrogate pairs included.
    #[default]
    Lossless,
    /// Reduced-capability mode: only U+0000..=U+00FF survive, everything else
    /// becomes `?` in both directions.
    Latin1,
}

/// Limits and calendar context for one reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub max_depth: usize,
    pub max_container_len: usize,
    /// Offset used for local (non-UTC) date-times and time-of-day anchoring.
    pub utc_offset: FixedOffset,
    pub transcoding: Transcoding,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_container_len: DEFAULT_MAX_CONTAINER_LEN,
            utc_offset: Utc.fix(),
            transcoding: Transcoding::Lossless,
        }
    }
}

impl Options {
    /// Sets the maximum nesting depth below the top-level variant.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum declared element count of one container.
    pub fn max_container_len(mut self, len: usize) -> Self {
        self.max_container_len = len;
        self
    }

    /// Sets the offset local calendar values are interpreted in.
    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Sets the text transcoding mode.
    pub fn transcoding(mut self, mode: Transcoding) -> Self {
        self.transcoding = mode;
        self
    }
}
