// Error handling for gwsumm-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid magic bytes: expected {expected:?}, got {got:?}")]
    InvalidMagic { expected: Vec<u8>, got: Vec<u8> },

    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unsupported compression type: {0}")]
    UnsupportedCompression(u8),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Invalid UTF-8 string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error(
        "Ambiguous channel request '{request}', multiple existing channels recovered:\n    {}",
        candidates.join("\n    ")
    )]
    AmbiguousChannel {
        request: String,
        candidates: Vec<String>,
    },

    #[error("Recursion error while accessing channel information for {request}")]
    Recursion { request: String },

    /// Raised internally when the resolver exceeds its depth limit, rewrapped
    /// as [`SummaryError::Recursion`] before reaching a caller.
    #[error("maximum channel resolution depth exceeded")]
    DepthExceeded,

    #[error("Unknown plot type: {0}")]
    UnknownPlotType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data acquisition failed: {0}")]
    Acquisition(String),

    #[error("Plot failed: {0}")]
    Plot(String),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
