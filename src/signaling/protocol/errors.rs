use std::io;

use thiserror::Error;

/// Body parsing / format problems.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),
    #[error("unknown signal kind {0}")]
    UnknownSignalKind(u8),
    #[error("truncated message body")]
    Truncated,
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,
    #[error("frame body exceeds the maximum length")]
    TooLarge,
    #[error("unsupported protocol version {0}")]
    BadVersion(u8),
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error("string too long ({actual} > {max})")]
    StringTooLong { max: usize, actual: usize },
}

impl ProtoError {
    /// Whether the stream is still aligned on a frame boundary after this
    /// error. A bad header leaves us unable to find the next frame; a bad
    /// body was already consumed in full.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::BadVersion(_) | Self::TooLarge)
    }
}

/// Frame-level error wrapper: IO vs protocol.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("protocol: {0}")]
    Proto(#[from] ProtoError),
}

impl FrameError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => false,
            Self::Proto(p) => p.is_recoverable(),
        }
    }
}
