//! Reads length-prefixed frames from an async byte stream.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::DEFAULT_MAX_FRAME_LEN;
use crate::config::Options;
use crate::datastream::Reader;
use crate::error::{DataStreamError, Result};
use crate::types::Variant;
use crate::user_type::UserTypeRegistry;

/// Reads whole frames from an `AsyncRead` stream so each message can be
/// decoded from a materialized buffer.
pub struct FrameReader<R> {
    reader: R,
    max_frame_len: usize,
    user_types: Arc<UserTypeRegistry>,
    options: Options,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            user_types: UserTypeRegistry::empty(),
            options: Options::default(),
        }
    }

    /// Sets the largest accepted frame payload.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Sets the user types available to [`read_variant`](Self::read_variant).
    pub fn user_types(mut self, user_types: Arc<UserTypeRegistry>) -> Self {
        self.user_types = user_types;
        self
    }

    /// Sets the codec options used by [`read_variant`](Self::read_variant).
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Reads one complete frame payload.
    ///
    /// An oversized frame is rejected before its payload is read; the stream
    /// is then out of sync and should be closed.
    pub async fn read_frame(&mut self) -> Result<BytesMut> {
        let len = self.reader.read_u32().await? as usize;
        if len > self.max_frame_len {
            tracing::debug!(len, max = self.max_frame_len, "rejecting oversized frame");
            return Err(DataStreamError::LimitExceeded(format!(
                "frame of {len} bytes exceeds {}",
                self.max_frame_len
            )));
        }

        let mut frame = BytesMut::zeroed(len);
        self.reader.read_exact(&mut frame).await?;
        tracing::trace!(len, "read frame");
        Ok(frame)
    }

    /// Reads one frame and decodes the single variant it carries.
    pub async fn read_variant(&mut self) -> Result<Variant> {
        let frame = self.read_frame().await?;
        let mut reader = Reader::with_user_types(&frame, Arc::clone(&self.user_types))
            .with_options(self.options);
        let value = reader.read_variant()?;
        if !reader.is_empty() {
            tracing::trace!(trailing = reader.remaining(), "ignoring bytes after variant");
        }
        Ok(value)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
