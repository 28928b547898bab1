//! 5-bit block formats.
//!
//! ```text
//! Q5_0 (22 bytes): d:f16 | qh:u32 | qs[16]
//! Q5_1 (24 bytes): d:f16 | m:f16 | qh:u32 | qs[16]
//! ```
//!
//! The low four bits of each code are packed into `qs` exactly as in Q4;
//! bit 4 of element `j` is bit `j` of `qh`.

use crate::utils::{BlockCodec, BlockStats, abs_max_signed, inverse, min_max, read_f16, write_f16};
use crate::{QK, impl_block_quantizer};
use ggmlq_format::QuantizationType;

const HALF: usize = QK / 2;

/// Symmetric 5-bit quantizer: `x ≈ d * (q - 16)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Q5_0Quantizer;

/// Offset 5-bit quantizer: `x ≈ d * q + m`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Q5_1Quantizer;

/// Write `qh` and `qs` for 32 five-bit codes.
fn pack(codes: &[u8; QK], out: &mut [u8]) {
    let mut qh = 0u32;
    for (j, &c) in codes.iter().enumerate() {
        qh |= (((c & 0x10) >> 4) as u32) << j;
    }
    out[..4].copy_from_slice(&qh.to_le_bytes());
    for j in 0..HALF {
        out[4 + j] = (codes[j] & 0x0F) | ((codes[j + HALF] & 0x0F) << 4);
    }
}

fn unpack(bytes: &[u8]) -> [u8; QK] {
    let qh = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let qs = &bytes[4..4 + HALF];
    let mut codes = [0u8; QK];
    for (j, c) in codes.iter_mut().enumerate() {
        let low = if j < HALF { qs[j] & 0x0F } else { qs[j - HALF] >> 4 };
        let high = (((qh >> j) & 1) as u8) << 4;
        *c = low | high;
    }
    codes
}

fn bins(codes: &[u8; QK]) -> [u8; QK] {
    codes.map(|c| c >> 1)
}

impl BlockCodec for Q5_0Quantizer {
    const QTYPE: QuantizationType = QuantizationType::Q5_0;
    const BLOCK_BYTES: usize = 2 + 4 + HALF;

    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats {
        let (_, max) = abs_max_signed(x);
        let d = max / -16.0;
        let id = inverse(d);

        let mut codes = [0u8; QK];
        for (c, &v) in codes.iter_mut().zip(x) {
            *c = ((v * id + 16.5) as i8).clamp(0, 31) as u8;
        }

        write_f16(out, d);
        pack(&codes, &mut out[2..]);
        BlockStats { scale: d, min: None, bins: bins(&codes) }
    }

    fn decode_block(block: &[u8], out: &mut [f32; QK]) {
        let d = read_f16(block);
        for (o, q) in out.iter_mut().zip(unpack(&block[2..])) {
            *o = (q as i32 - 16) as f32 * d;
        }
    }
}

impl BlockCodec for Q5_1Quantizer {
    const QTYPE: QuantizationType = QuantizationType::Q5_1;
    const BLOCK_BYTES: usize = 2 + 2 + 4 + HALF;

    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats {
        let (min, max) = min_max(x);
        let d = (max - min) / 31.0;
        let id = inverse(d);

        let mut codes = [0u8; QK];
        for (c, &v) in codes.iter_mut().zip(x) {
            *c = (((v - min) * id + 0.5) as i8).clamp(0, 31) as u8;
        }

        write_f16(out, d);
        write_f16(&mut out[2..], min);
        pack(&codes, &mut out[4..]);
        BlockStats { scale: d, min: Some(min), bins: bins(&codes) }
    }

    fn decode_block(block: &[u8], out: &mut [f32; QK]) {
        let d = read_f16(block);
        let m = read_f16(&block[2..]);
        for (o, q) in out.iter_mut().zip(unpack(&block[4..])) {
            *o = q as f32 * d + m;
        }
    }
}

impl_block_quantizer!(Q5_0Quantizer);
impl_block_quantizer!(Q5_1Quantizer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuantizerTrait;

    #[test]
    fn pack_unpack_high_bits() {
        let mut codes = [0u8; QK];
        for (j, c) in codes.iter_mut().enumerate() {
            *c = (j as u8 * 7) % 32;
        }
        let mut buf = [0u8; 4 + HALF];
        pack(&codes, &mut buf);
        assert_eq!(unpack(&buf), codes);
    }

    #[test]
    fn q5_0_known_block() {
        // max magnitude -16 => d = 1, codes = x + 16
        let mut x = [0.0f32; QK];
        x[0] = -16.0;
        x[5] = 15.0;
        x[20] = 1.0;
        let qt = Q5_0Quantizer.quantize(&x).unwrap();
        assert_eq!(qt.data.len(), 22);
        assert_eq!(qt.scales, vec![1.0]);

        let qh = u32::from_le_bytes([qt.data[2], qt.data[3], qt.data[4], qt.data[5]]);
        // code 16 (zero) sets the high bit everywhere except element 0 (code 0)
        assert_eq!(qh, !1u32);
        assert_eq!(qt.data[6], 0x00);
        assert_eq!(qt.data[6 + 5], 0x0F);
        assert_eq!(qt.data[6 + 4], 0x10);
    }

    #[test]
    fn q5_1_dequantize_close() {
        let x: Vec<f32> = (0..48).map(|i| (i as f32).sin()).collect();
        let qt = Q5_1Quantizer.quantize(&x).unwrap();
        assert_eq!(qt.data.len(), 48);
        let back = Q5_1Quantizer.dequantize(&qt).unwrap();
        assert_eq!(back.len(), 48);
        for (o, r) in x.iter().zip(&back) {
            assert!((o - r).abs() < 0.05, "{o} vs {r}");
        }
    }

    #[test]
    fn q5_histogram_uses_upper_four_bits() {
        let qt = Q5_0Quantizer.quantize(&[0.0; QK]).unwrap();
        assert_eq!(qt.histogram[8], QK as u64);
    }
}
