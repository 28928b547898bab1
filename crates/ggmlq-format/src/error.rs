//! Errors produced while reading or writing a legacy GGML stream.

use std::io;
use thiserror::Error;

/// Errors returned by the wire-format readers and writers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatError {
    /// The stream does not start with a recognized magic, or a structural
    /// field is out of range.
    #[error("invalid format: {reason}")]
    InvalidFormat { reason: String },

    /// The stream ended before a field was fully read.
    #[error("truncated input while reading {what}: needed {needed} bytes, got {got}")]
    TruncatedInput { what: &'static str, needed: usize, got: usize },

    /// An element-type tag that this crate cannot size.
    #[error("unsupported element type id {id}")]
    UnsupportedType { id: i32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FormatError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidFormat { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
