//! Error taxonomy of a conversion run.

use crate::exit;
use ggmlq_format::FormatError;
use ggmlq_quantization::QuantizationError;
use std::io;
use thiserror::Error;

/// Every way a conversion can fail. All of them abort the run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QuantizeError {
    /// Bad magic or a structurally impossible field.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The input ended in the middle of a field.
    #[error("truncated input while reading {what}: needed {needed} bytes, got {got}")]
    TruncatedInput { what: &'static str, needed: usize, got: usize },

    /// An element type that cannot be sized or cannot be quantized.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The encoder rejected a tensor or produced a payload of the wrong size.
    #[error("encoding failed: {0}")]
    EncodingFailure(String),

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// Bad pattern or configuration file.
    #[error("configuration error: {0}")]
    Config(String),
}

impl QuantizeError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidFormat(_) => exit::EXIT_INVALID_FORMAT,
            Self::TruncatedInput { .. } => exit::EXIT_TRUNCATED_INPUT,
            Self::UnsupportedType(_) => exit::EXIT_UNSUPPORTED_TYPE,
            Self::EncodingFailure(_) => exit::EXIT_ENCODING_FAILURE,
            Self::Io(_) => exit::EXIT_IO,
            Self::Config(_) => exit::EXIT_USAGE,
        }
    }
}

impl From<FormatError> for QuantizeError {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::InvalidFormat { reason } => Self::InvalidFormat(reason),
            FormatError::TruncatedInput { what, needed, got } => {
                Self::TruncatedInput { what, needed, got }
            }
            FormatError::UnsupportedType { id } => {
                Self::UnsupportedType(format!("unknown element type id {id}"))
            }
            FormatError::Io(e) => Self::Io(e),
            other => Self::InvalidFormat(other.to_string()),
        }
    }
}

impl From<QuantizationError> for QuantizeError {
    fn from(e: QuantizationError) -> Self {
        match e {
            QuantizationError::UnsupportedType { .. } => Self::UnsupportedType(e.to_string()),
            other => Self::EncodingFailure(other.to_string()),
        }
    }
}

impl From<regex::Error> for QuantizeError {
    fn from(e: regex::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<toml::de::Error> for QuantizeError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QuantizeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ggmlq_format::QuantizationType;

    #[test]
    fn format_errors_keep_their_category() {
        let e: QuantizeError =
            FormatError::TruncatedInput { what: "tensor payload", needed: 64, got: 10 }.into();
        assert!(matches!(e, QuantizeError::TruncatedInput { needed: 64, got: 10, .. }));
        assert_eq!(e.exit_code(), exit::EXIT_TRUNCATED_INPUT);

        let e: QuantizeError = FormatError::UnsupportedType { id: 42 }.into();
        assert_eq!(e.exit_code(), exit::EXIT_UNSUPPORTED_TYPE);

        let e: QuantizeError = FormatError::InvalidFormat { reason: "bad magic".into() }.into();
        assert_eq!(e.to_string(), "invalid format: bad magic");
    }

    #[test]
    fn encoder_errors_map_to_encoding_failure() {
        let e: QuantizeError = QuantizationError::EncodingFailure {
            qtype: QuantizationType::Q8_0,
            reason: "non-finite".into(),
        }
        .into();
        assert_eq!(e.exit_code(), exit::EXIT_ENCODING_FAILURE);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            QuantizeError::InvalidFormat(String::new()).exit_code(),
            QuantizeError::TruncatedInput { what: "x", needed: 1, got: 0 }.exit_code(),
            QuantizeError::UnsupportedType(String::new()).exit_code(),
            QuantizeError::EncodingFailure(String::new()).exit_code(),
            QuantizeError::Io(io::Error::other("x")).exit_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, exit::EXIT_SUCCESS);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
