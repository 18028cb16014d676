//! # Networking Error Types

use thiserror::Error;

/// Result type for networking operations.
pub type NetResult<T> = Result<T, NetError>;

/// A line that could not be turned into a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not JSON, not an object, or fields do not match the message kind.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Object without a string `type` field.
    #[error("message has no `type` discriminator")]
    MissingType,

    /// `type` names no known message for this direction.
    #[error("unknown message type `{0}`")]
    UnknownType(String),

    /// Line exceeds the protocol size limit.
    #[error("message of {0} bytes exceeds the size limit")]
    TooLarge(usize),
}

/// Errors from the transport and the binaries.
#[derive(Error, Debug)]
pub enum NetError {
    /// Socket error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Outgoing message could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Incoming message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] cairn_core::ConfigError),

    /// The other side of an in-process channel is gone.
    #[error("channel closed")]
    ChannelClosed,
}
