//! Utility functions shared by the block quantizers

use crate::{HIST_BINS, Histogram, QK, QuantizationError, QuantizedTensor, Result};
use ggmlq_format::QuantizationType;
use half::f16;

/// One fixed-size block encoding.
///
/// Implementors see exactly `QK` values; the driver zero-pads a short tail.
pub(crate) trait BlockCodec {
    const QTYPE: QuantizationType;
    /// Encoded block length in bytes.
    const BLOCK_BYTES: usize;

    /// Encode `x` into `out` (exactly `BLOCK_BYTES` long). Returns the block
    /// scale, the block minimum for offset formats, and the histogram bin of
    /// every element.
    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats;

    /// Inverse of [`encode_block`](Self::encode_block), up to quantization error.
    fn decode_block(block: &[u8], out: &mut [f32; QK]);
}

pub(crate) struct BlockStats {
    pub scale: f32,
    pub min: Option<f32>,
    pub bins: [u8; QK],
}

/// Signed value with the largest magnitude, and that magnitude.
pub(crate) fn abs_max_signed(x: &[f32]) -> (f32, f32) {
    x.iter().fold((0.0f32, 0.0f32), |(amax, max), &v| {
        if v.abs() > amax { (v.abs(), v) } else { (amax, max) }
    })
}

pub(crate) fn min_max(x: &[f32]) -> (f32, f32) {
    x.iter().fold((f32::MAX, -f32::MAX), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[inline]
pub(crate) fn inverse(d: f32) -> f32 {
    if d != 0.0 { 1.0 / d } else { 0.0 }
}

#[inline]
pub(crate) fn write_f16(out: &mut [u8], v: f32) {
    out[..2].copy_from_slice(&f16::from_f32(v).to_le_bytes());
}

#[inline]
pub(crate) fn read_f16(bytes: &[u8]) -> f32 {
    f16::from_le_bytes([bytes[0], bytes[1]]).to_f32()
}

/// Reject NaN and infinities before they reach a kernel.
pub fn check_finite(data: &[f32], qtype: QuantizationType) -> Result<()> {
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(QuantizationError::EncodingFailure {
            qtype,
            reason: format!("non-finite value {} at index {pos}", data[pos]),
        });
    }
    Ok(())
}

/// Encode `data` block by block with codec `C`.
pub(crate) fn encode_blocks<C: BlockCodec>(data: &[f32]) -> Result<QuantizedTensor> {
    check_finite(data, C::QTYPE)?;

    let n_blocks = data.len().div_ceil(QK);
    let size = n_blocks.checked_mul(C::BLOCK_BYTES).ok_or_else(|| {
        QuantizationError::EncodingFailure {
            qtype: C::QTYPE,
            reason: format!("{} elements overflow the packed size", data.len()),
        }
    })?;

    let mut packed = vec![0u8; size];
    let mut scales = Vec::with_capacity(n_blocks);
    let mut mins = Vec::new();
    let mut histogram: Histogram = [0; HIST_BINS];

    for (chunk, out) in data.chunks(QK).zip(packed.chunks_exact_mut(C::BLOCK_BYTES)) {
        let mut block = [0.0f32; QK];
        block[..chunk.len()].copy_from_slice(chunk);

        let stats = C::encode_block(&block, out);
        scales.push(stats.scale);
        if let Some(m) = stats.min {
            mins.push(m);
        }
        for &bin in &stats.bins[..chunk.len()] {
            histogram[bin as usize] += 1;
        }
    }

    tracing::trace!(qtype = %C::QTYPE, n_blocks, bytes = packed.len(), "encoded blocks");
    Ok(QuantizedTensor {
        data: packed,
        scales,
        mins: if mins.is_empty() { None } else { Some(mins) },
        histogram,
        qtype: C::QTYPE,
        n_elements: data.len(),
    })
}

/// Decode a tensor produced by [`encode_blocks`] with the same codec.
pub(crate) fn decode_blocks<C: BlockCodec>(tensor: &QuantizedTensor) -> Result<Vec<f32>> {
    if tensor.qtype != C::QTYPE {
        return Err(QuantizationError::UnsupportedType {
            qtype: tensor.qtype.to_string(),
            expected: C::QTYPE.to_string(),
        });
    }
    let expected = tensor.n_elements.div_ceil(QK) * C::BLOCK_BYTES;
    if tensor.data.len() != expected {
        return Err(QuantizationError::EncodingFailure {
            qtype: C::QTYPE,
            reason: format!("packed length {} != {expected}", tensor.data.len()),
        });
    }

    let mut values = Vec::with_capacity(tensor.n_elements.div_ceil(QK) * QK);
    let mut block = [0.0f32; QK];
    for bytes in tensor.data.chunks_exact(C::BLOCK_BYTES) {
        C::decode_block(bytes, &mut block);
        values.extend_from_slice(&block);
    }
    values.truncate(tensor.n_elements);
    Ok(values)
}

/// Calculate mean squared error between two tensors
pub fn calculate_mse(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(QuantizationError::LengthMismatch { left: a.len(), right: b.len() });
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    Ok(a.iter().zip(b).map(|(&x, &y)| (x - y).powi(2)).sum::<f32>() / a.len() as f32)
}

/// Calculate signal-to-noise ratio in dB
pub fn calculate_snr(original: &[f32], quantized: &[f32]) -> Result<f32> {
    let noise = calculate_mse(original, quantized)?;
    if noise == 0.0 {
        return Ok(f32::INFINITY);
    }
    let signal = original.iter().map(|&x| x * x).sum::<f32>() / original.len() as f32;
    Ok(10.0 * (signal / noise).log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_max_keeps_sign() {
        assert_eq!(abs_max_signed(&[1.0, -3.0, 2.0]), (3.0, -3.0));
        assert_eq!(abs_max_signed(&[0.0, 0.0]), (0.0, 0.0));
    }

    #[test]
    fn min_max_of_block() {
        assert_eq!(min_max(&[1.0, -3.0, 2.0]), (-3.0, 2.0));
    }

    #[test]
    fn inverse_of_zero_is_zero() {
        assert_eq!(inverse(0.0), 0.0);
        assert_eq!(inverse(4.0), 0.25);
    }

    #[test]
    fn f16_roundtrip() {
        let mut buf = [0u8; 2];
        write_f16(&mut buf, 0.5);
        assert_eq!(read_f16(&buf), 0.5);
    }

    #[test]
    fn non_finite_rejected() {
        let err = check_finite(&[1.0, f32::NAN], QuantizationType::Q4_0).unwrap_err();
        assert!(err.to_string().contains("index 1"));
        assert!(check_finite(&[f32::INFINITY], QuantizationType::Q8_0).is_err());
        assert!(check_finite(&[0.0, -1.0], QuantizationType::Q8_0).is_ok());
    }

    #[test]
    fn mse_and_snr() {
        assert_eq!(calculate_mse(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(calculate_snr(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), f32::INFINITY);
        assert!((calculate_mse(&[0.0, 0.0], &[1.0, 1.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(calculate_mse(&[0.0], &[]).is_err());
    }
}
