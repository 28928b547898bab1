//! Streaming quantizer for legacy GGML (`ggml` / `ggmf`) checkpoints.
//!
//! The header and vocabulary are copied verbatim, the hyperparameter
//! `ftype` is replaced by the target type, and every tensor record is either
//! copied byte for byte or re-encoded with one of the block formats from
//! [`ggmlq_quantization`], depending on [`QuantizationRules`].
//!
//! ```no_run
//! use ggmlq_quantize::{QuantizeConfig, quantize_model};
//! use ggmlq_format::QuantizationType;
//! use std::path::Path;
//!
//! let report = quantize_model(
//!     Path::new("model-f32.bin"),
//!     Path::new("model-q4_0.bin"),
//!     QuantizationType::Q4_0,
//!     &QuantizeConfig::default(),
//! )?;
//! println!("{} tensors quantized", report.stats.quantized);
//! # Ok::<(), ggmlq_quantize::QuantizeError>(())
//! ```

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod exit;
pub mod rules;

pub use config::QuantizeConfig;
pub use convert::{ConversionReport, quantize_model, quantize_stream};
pub use engine::{QuantizationStats, TensorQuantizer};
pub use error::{QuantizeError, Result};
pub use rules::QuantizationRules;
