//! Message framing for the IRC core control protocol: each message is a
//! 4-byte big-endian length followed by that many payload bytes.

pub mod reader;
pub mod writer;

pub use reader::FrameReader;
pub use writer::FrameWriter;

/// Default upper bound on a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
