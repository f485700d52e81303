//! Error types for the mrdigest domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error enum; the top-level [`Error`]
//! wraps the ones that can abort an invocation. [`DiffError`] never does,
//! so it has no top-level variant.

use thiserror::Error;

/// The top-level error type for all mrdigest operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Tokenizer errors (fatal for an invocation) ---
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    // --- Source errors ---
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

/// Failures while reading or rewriting a single file's patch.
///
/// The pipeline treats every variant as recoverable: it logs the error and
/// falls back to the raw patch text for that file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("malformed hunk header: {0:?}")]
    MalformedHunkHeader(String),

    #[error("hunk range out of bounds in header {header:?}")]
    RangeOverflow { header: String },

    #[error("content of {filename} is not valid UTF-8")]
    Decode { filename: String },
}

#[derive(Debug, Clone, Error)]
pub enum TokenizerError {
    #[error("Tokenizer not available: {0}")]
    NotAvailable(String),

    #[error("Failed to encode text: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Merge request not found: {0}")]
    NotFound(String),

    #[error("Failed to read source {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid source payload: {0}")]
    InvalidPayload(String),
}
