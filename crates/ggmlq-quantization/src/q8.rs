//! 8-bit block format.
//!
//! ```text
//! Q8_0 (34 bytes): d:f16 | qs:i8[32]
//! ```

use crate::utils::{BlockCodec, BlockStats, abs_max_signed, inverse, read_f16, write_f16};
use crate::{QK, impl_block_quantizer};
use ggmlq_format::QuantizationType;

/// Symmetric 8-bit quantizer: `x ≈ d * q`, `q` in `-127..=127`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Q8_0Quantizer;

impl BlockCodec for Q8_0Quantizer {
    const QTYPE: QuantizationType = QuantizationType::Q8_0;
    const BLOCK_BYTES: usize = 2 + QK;

    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats {
        let (amax, _) = abs_max_signed(x);
        let d = amax / 127.0;
        let id = inverse(d);

        let qs: [i8; QK] = x.map(|v| (v * id).round() as i8);
        // q / 16 truncates toward zero, giving bins 1..=15
        let bins = qs.map(|q| (q / 16 + 8) as u8);

        write_f16(out, d);
        out[2..].copy_from_slice(bytemuck::cast_slice(&qs[..]));
        BlockStats { scale: d, min: None, bins }
    }

    fn decode_block(block: &[u8], out: &mut [f32; QK]) {
        let d = read_f16(block);
        let qs: &[i8] = bytemuck::cast_slice(&block[2..2 + QK]);
        for (o, &q) in out.iter_mut().zip(qs) {
            *o = q as f32 * d;
        }
    }
}

impl_block_quantizer!(Q8_0Quantizer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuantizerTrait;

    #[test]
    fn q8_0_extremes_map_to_127() {
        let mut x = [0.0f32; QK];
        x[0] = 2.54;
        x[1] = -2.54;
        x[2] = 1.0;
        let qt = Q8_0Quantizer.quantize(&x).unwrap();
        assert_eq!(qt.data.len(), 34);
        assert_eq!(qt.data[2] as i8, 127);
        assert_eq!(qt.data[3] as i8, -127);
        assert_eq!(qt.data[4] as i8, 50);
        assert_eq!(qt.data[5], 0);
    }

    #[test]
    fn q8_0_histogram_bins() {
        let mut x = [0.0f32; QK];
        x[0] = 1.0;
        x[1] = -1.0;
        let qt = Q8_0Quantizer.quantize(&x).unwrap();
        // 127/16 = 7 -> bin 15, -127/16 = -7 -> bin 1, zeros -> bin 8
        assert_eq!(qt.histogram[15], 1);
        assert_eq!(qt.histogram[1], 1);
        assert_eq!(qt.histogram[8], (QK - 2) as u64);
    }

    #[test]
    fn q8_0_roundtrip_is_tight() {
        let x: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).cos() * 3.0).collect();
        let qt = Q8_0Quantizer.quantize(&x).unwrap();
        assert_eq!(qt.data.len(), 4 * 34);
        let back = Q8_0Quantizer.dequantize(&qt).unwrap();
        let snr = crate::utils::calculate_snr(&x, &back).unwrap();
        assert!(snr > 35.0, "snr {snr}");
    }
}
