//! Writes length-prefixed frames to an async byte stream.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::Options;
use crate::datastream::Writer;
use crate::error::{DataStreamError, Result};
use crate::types::Variant;
use crate::user_type::UserTypeRegistry;

/// Writes framed messages to an `AsyncWrite` stream.
pub struct FrameWriter<W> {
    writer: W,
    user_types: Arc<UserTypeRegistry>,
    options: Options,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            user_types: UserTypeRegistry::empty(),
            options: Options::default(),
        }
    }

    /// Sets the user types available to [`write_variant`](Self::write_variant).
    pub fn user_types(mut self, user_types: Arc<UserTypeRegistry>) -> Self {
        self.user_types = user_types;
        self
    }

    /// Sets the codec options used by [`write_variant`](Self::write_variant).
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Writes the 4-byte length prefix and the payload.
    pub async fn write_frame(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            DataStreamError::ValueOutOfRange(format!("frame of {} bytes", data.len()))
        })?;
        self.writer.write_all(&len.to_be_bytes()).await?;
        self.writer.write_all(data).await?;
        tracing::trace!(len, "wrote frame");
        Ok(())
    }

    /// Encodes `value` and writes it as one frame.
    pub async fn write_variant(&mut self, value: &Variant) -> Result<()> {
        let mut encoder = Writer::with_user_types(Arc::clone(&self.user_types))
            .with_options(self.options);
        encoder.write_variant(value)?;
        self.write_frame(encoder.as_bytes()).await
    }

    /// Flushes the underlying writer.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
