use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning and interpreting the ASCII header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Header structure is broken (missing sentinel, stray value lines).
    #[error("malformed header at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// A recognized key's value failed its type-specific parse.
    #[error("invalid value for header field {key}: {reason}")]
    InvalidFieldFormat { key: String, reason: String },

    /// A key the body decoder depends on is absent from the file.
    #[error("missing required header field: {key}")]
    MissingRequiredField { key: &'static str },

    /// Lookup of a key that is not present in the header. This is a caller
    /// error, not a file defect.
    #[error("unknown header key: {key}")]
    UnknownKey { key: String },
}

/// Errors raised while decoding the binary sample grids.
#[derive(Debug, Error)]
pub enum BodyError {
    /// Fewer bytes remain than the computed channel layout requires.
    #[error("truncated body: layout requires {required} bytes, {actual} available")]
    Truncated { required: usize, actual: usize },
}

/// Top-level error type for a decode.
///
/// Trailing bytes after the last sample grid are the one condition that is
/// recovered locally (logged as a warning); everything else aborts the
/// decode with no partial image returned.
#[derive(Debug, Error)]
pub enum SxmError {
    /// I/O error while reading the file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Header scanning or interpretation error.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// Binary body layout error.
    #[error(transparent)]
    Body(#[from] BodyError),

    /// A channel name absent from the channel table was requested.
    #[error("unknown channel: {name}")]
    UnknownChannel { name: String },
}
