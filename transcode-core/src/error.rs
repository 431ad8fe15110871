//! Error types for the coding engine.
//!
//! Every error maps to exactly one [`ErrorKind`] of a small closed taxonomy.
//! Flow-control outcomes (busy, not ready, exhausted) are not errors and are
//! reported through status enums by the state machine instead.

use thiserror::Error;

/// Closed set of conditions surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Retry after draining the other direction.
    WouldBlock,
    /// The stream has ended.
    EndOfStream,
    /// The coder is not in a state that allows the operation.
    InvalidState,
    /// Configuration could not be negotiated with the algorithm.
    NegotiationFailed,
    /// An allocation failed.
    OutOfMemory,
    /// Opaque algorithm-specific coding failure.
    AlgorithmFault,
    /// A caller-supplied argument is out of range or malformed.
    InvalidArgument,
}

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Retry after draining output.
    #[error("Resource temporarily unavailable")]
    WouldBlock,

    /// End of stream reached.
    #[error("End of stream")]
    EndOfStream,

    /// Operation not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration rejected by the algorithm.
    #[error("Negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Requested feature or format is not supported.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Allocation failure.
    #[error("Out of memory: failed to allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Coding errors (encoding/decoding).
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Algorithm-specific coding errors.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input data is malformed.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Bitstream corruption detected.
    #[error("Bitstream corruption at offset {offset}")]
    BitstreamCorruption { offset: u64 },

    /// Missing reference frame.
    #[error("Missing reference frame: {frame_num}")]
    MissingReference { frame_num: u32 },

    /// Unit parameters differ from the negotiated ones.
    #[error("Parameter change: {0}")]
    ParameterChange(String),

    /// Algorithm state was used before being opened.
    #[error("Coder not initialized")]
    NotInitialized,

    /// An internal limit was exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Internal invariant violation inside the algorithm.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic codec error message.
    #[error("{0}")]
    Other(String),
}

impl CodecError {
    /// Whether the algorithm can keep coding after reporting this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CodecError::NotInitialized | CodecError::ResourceExhausted(_) | CodecError::Internal(_)
        )
    }
}

impl From<String> for CodecError {
    fn from(s: String) -> Self {
        CodecError::Other(s)
    }
}

impl From<&str> for CodecError {
    fn from(s: &str) -> Self {
        CodecError::Other(s.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for code that only produces coding errors.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a negotiation error.
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Error::NegotiationFailed(msg.into())
    }

    /// Classify this error into the closed taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::WouldBlock => ErrorKind::WouldBlock,
            Error::EndOfStream => ErrorKind::EndOfStream,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::NegotiationFailed(_) | Error::Unsupported(_) => ErrorKind::NegotiationFailed,
            Error::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Error::Codec(_) => ErrorKind::AlgorithmFault,
            Error::InvalidParameter(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Check if this is an end-of-stream error.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// Check if processing may continue after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Codec(e) => e.is_recoverable(),
            Error::OutOfMemory { .. } | Error::WouldBlock | Error::InvalidParameter(_) => true,
            _ => false,
        }
    }
}
