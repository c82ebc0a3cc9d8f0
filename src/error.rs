//! Error types for the QDataStream codec.

/// Errors that can occur while encoding or decoding QDataStream values.
#[derive(Debug, thiserror::Error)]
pub enum DataStreamError {
    #[error("buffer underflow: need {needed} bytes but only {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("invalid/unknown variant type ({0})")]
    UnknownType(u32),

    #[error("unknown user type \"{0}\" does not have any data mapping")]
    UnknownUserType(String),

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("malformed user type name: {0}")]
    MalformedUserTypeName(String),

    #[error("malformed string: {0}")]
    MalformedString(String),

    #[error("value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataStreamError {
    /// Returns `true` if more input bytes could have made the decode succeed.
    pub fn is_underflow(&self) -> bool {
        matches!(self, Self::BufferUnderflow { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = DataStreamError> = std::result::Result<T, E>;
