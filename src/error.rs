//! Error types for the vecfind library.
//!
//! All fallible operations return [`VecfindError`] through the crate-wide
//! [`Result`] alias. Encode-time errors are raised to the caller building a
//! request; decode-time errors for a single storage object are captured in
//! that object's outcome by the dispatcher instead of aborting the batch.
//!
//! # Examples
//!
//! ```
//! use vecfind::error::{Result, VecfindError};
//!
//! fn lookup(code: u8) -> Result<()> {
//!     Err(VecfindError::unknown_type(format!("code {code}")))
//! }
//!
//! assert!(matches!(lookup(42), Err(VecfindError::UnknownType(_))));
//! ```

use std::io;

use thiserror::Error;

/// The main error type for vecfind operations.
#[derive(Error, Debug)]
pub enum VecfindError {
    /// Element type name or code outside the fixed table.
    #[error("Unknown element type: {0}")]
    UnknownType(String),

    /// Vector geometry does not fit inside the record.
    #[error("Record overflow: {0}")]
    RecordOverflow(String),

    /// Record bytes shorter than the declared record size.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    /// A response read would run past the end of the buffer.
    #[error("Truncated response: {0}")]
    TruncatedResponse(String),

    /// Decoded response count differs from the number of submitted requests.
    #[error("Protocol mismatch: expected {expected} responses, got {actual}")]
    ProtocolMismatch { expected: usize, actual: usize },

    /// Malformed textual vector format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The storage layer rejected the call with a non-positive return code.
    #[error("Remote failure: return code {0}")]
    RemoteFailure(i32),

    /// Storage collaborator errors (submission failures, unknown objects).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid argument supplied by the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with VecfindError.
pub type Result<T> = std::result::Result<T, VecfindError>;

impl VecfindError {
    /// Create a new unknown type error.
    pub fn unknown_type<S: Into<String>>(msg: S) -> Self {
        VecfindError::UnknownType(msg.into())
    }

    /// Create a new record overflow error.
    pub fn record_overflow<S: Into<String>>(msg: S) -> Self {
        VecfindError::RecordOverflow(msg.into())
    }

    /// Create a new truncated record error.
    pub fn truncated_record<S: Into<String>>(msg: S) -> Self {
        VecfindError::TruncatedRecord(msg.into())
    }

    /// Create a new truncated response error.
    pub fn truncated_response<S: Into<String>>(msg: S) -> Self {
        VecfindError::TruncatedResponse(msg.into())
    }

    /// Create a new invalid format error.
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        VecfindError::InvalidFormat(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        VecfindError::Storage(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        VecfindError::InvalidArgument(msg.into())
    }

    /// Whether this error was produced while decoding a reply.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            VecfindError::TruncatedRecord(_)
                | VecfindError::TruncatedResponse(_)
                | VecfindError::UnknownType(_)
                | VecfindError::ProtocolMismatch { .. }
        )
    }
}
