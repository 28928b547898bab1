//! Block quantization for legacy GGML checkpoints
//!
//! This crate provides the encoders the converter hands float tensors to:
//! - Q4_0: 4-bit symmetric, one f16 scale per 32 values
//! - Q4_1: 4-bit with f16 scale and f16 minimum
//! - Q5_0 / Q5_1: 5-bit variants with a packed high-bit word
//! - Q8_0: 8-bit symmetric
//!
//! Every encoder works on blocks of [`QK`] values. A trailing partial block
//! is zero-padded, so the packed size depends only on the element count and
//! the target type (see [`expected_size`]).

use ggmlq_format::QuantizationType;
use thiserror::Error;

pub mod q4;
pub mod q5;
pub mod q8;
pub mod utils;

pub use q4::{Q4_0Quantizer, Q4_1Quantizer};
pub use q5::{Q5_0Quantizer, Q5_1Quantizer};
pub use q8::Q8_0Quantizer;

/// Elements per block for every supported encoding.
pub const QK: usize = 32;

/// Number of bins in the quantized-value histogram.
pub const HIST_BINS: usize = 16;

/// Counts of quantized codes, bucketed into [`HIST_BINS`] bins.
pub type Histogram = [u64; HIST_BINS];

/// Errors produced by the encoders.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QuantizationError {
    #[error("{qtype} encoding failed: {reason}")]
    EncodingFailure { qtype: QuantizationType, reason: String },

    #[error("cannot decode {qtype} data with the {expected} quantizer")]
    UnsupportedType { qtype: String, expected: String },

    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
}

pub type Result<T> = std::result::Result<T, QuantizationError>;

/// Packed output size for `n_elements` values of `qtype`, or `None` on
/// overflow. Depends on nothing but its two arguments.
pub fn expected_size(qtype: QuantizationType, n_elements: usize) -> Option<usize> {
    qtype.expected_size(n_elements)
}

/// Quantized tensor representation with packed data and per-block metadata
#[derive(Debug, Clone)]
pub struct QuantizedTensor {
    /// Packed blocks, ready to be written as a tensor payload
    pub data: Vec<u8>,
    /// Scale factor of every block
    pub scales: Vec<f32>,
    /// Block minimum for the offset formats (Q4_1, Q5_1)
    pub mins: Option<Vec<f32>>,
    /// Histogram of quantized codes over the real (unpadded) elements
    pub histogram: Histogram,
    /// Quantization type used
    pub qtype: QuantizationType,
    /// Number of source elements
    pub n_elements: usize,
}

impl QuantizedTensor {
    pub fn n_blocks(&self) -> usize {
        self.n_elements.div_ceil(QK)
    }

    /// Compression ratio compared to FP32 storage.
    pub fn compression_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 1.0;
        }
        (self.n_elements * 4) as f32 / self.data.len() as f32
    }
}

/// Trait for quantizer implementations
pub trait QuantizerTrait: Send + Sync {
    /// Quantize a flat buffer of f32 values
    fn quantize(&self, data: &[f32]) -> Result<QuantizedTensor>;

    /// Dequantize back to f32 values
    fn dequantize(&self, tensor: &QuantizedTensor) -> Result<Vec<f32>>;

    /// Get the quantization type
    fn quantization_type(&self) -> QuantizationType;
}

/// Quantizer factory for creating the encoder of a target type
pub struct QuantizerFactory;

impl QuantizerFactory {
    pub fn create(qtype: QuantizationType) -> Box<dyn QuantizerTrait> {
        match qtype {
            QuantizationType::Q4_0 => Box::new(Q4_0Quantizer),
            QuantizationType::Q4_1 => Box::new(Q4_1Quantizer),
            QuantizationType::Q5_0 => Box::new(Q5_0Quantizer),
            QuantizationType::Q5_1 => Box::new(Q5_1Quantizer),
            QuantizationType::Q8_0 => Box::new(Q8_0Quantizer),
        }
    }
}

/// Implements [`QuantizerTrait`] for a unit struct that implements
/// `utils::BlockCodec`.
macro_rules! impl_block_quantizer {
    ($ty:ty) => {
        impl $crate::QuantizerTrait for $ty {
            fn quantize(&self, data: &[f32]) -> $crate::Result<$crate::QuantizedTensor> {
                $crate::utils::encode_blocks::<Self>(data)
            }

            fn dequantize(&self, tensor: &$crate::QuantizedTensor) -> $crate::Result<Vec<f32>> {
                $crate::utils::decode_blocks::<Self>(tensor)
            }

            fn quantization_type(&self) -> ggmlq_format::QuantizationType {
                <Self as $crate::utils::BlockCodec>::QTYPE
            }
        }
    };
}
pub(crate) use impl_block_quantizer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_returns_matching_type() {
        for q in QuantizationType::ALL {
            assert_eq!(QuantizerFactory::create(q).quantization_type(), q);
        }
    }

    #[test]
    fn packed_size_is_independent_of_values() {
        for q in QuantizationType::ALL {
            let zeros = QuantizerFactory::create(q).quantize(&[0.0; 16]).unwrap();
            let ramp: Vec<f32> = (0..16).map(|i| i as f32 - 8.0).collect();
            let ramp = QuantizerFactory::create(q).quantize(&ramp).unwrap();
            assert_eq!(Some(zeros.data.len()), expected_size(q, 16));
            assert_eq!(Some(ramp.data.len()), expected_size(q, 16));
        }
    }

    #[test]
    fn empty_input_packs_to_nothing() {
        let qt = QuantizerFactory::create(QuantizationType::Q4_0).quantize(&[]).unwrap();
        assert!(qt.data.is_empty());
        assert_eq!(qt.n_blocks(), 0);
        assert_eq!(qt.compression_ratio(), 1.0);
    }

    #[test]
    fn histogram_counts_real_elements_only() {
        for q in QuantizationType::ALL {
            let qt = QuantizerFactory::create(q).quantize(&[1.0; 40]).unwrap();
            assert_eq!(qt.histogram.iter().sum::<u64>(), 40, "{q}");
        }
    }

    #[test]
    fn dequantize_rejects_other_type() {
        let qt = Q4_0Quantizer.quantize(&[1.0; 32]).unwrap();
        assert!(matches!(
            Q8_0Quantizer.dequantize(&qt),
            Err(QuantizationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn q8_compression_ratio() {
        let qt = Q8_0Quantizer.quantize(&[0.5; 64]).unwrap();
        assert!((qt.compression_ratio() - 256.0 / 68.0).abs() < 1e-6);
    }
}
