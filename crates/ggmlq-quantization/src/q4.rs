//! 4-bit block formats.
//!
//! ```text
//! Q4_0 (18 bytes): d:f16 | qs[16]
//! Q4_1 (20 bytes): d:f16 | m:f16 | qs[16]
//! ```
//!
//! `qs[j]` holds element `j` in its low nibble and element `j + 16` in its
//! high nibble.

use crate::utils::{BlockCodec, BlockStats, abs_max_signed, inverse, min_max, read_f16, write_f16};
use crate::{QK, impl_block_quantizer};
use ggmlq_format::QuantizationType;

const HALF: usize = QK / 2;

/// Symmetric 4-bit quantizer: `x ≈ d * (q - 8)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Q4_0Quantizer;

/// Offset 4-bit quantizer: `x ≈ d * q + m`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Q4_1Quantizer;

fn pack_nibbles(codes: &[u8; QK], qs: &mut [u8]) {
    for j in 0..HALF {
        qs[j] = codes[j] | (codes[j + HALF] << 4);
    }
}

fn unpack_nibbles(qs: &[u8]) -> [u8; QK] {
    let mut codes = [0u8; QK];
    for j in 0..HALF {
        codes[j] = qs[j] & 0x0F;
        codes[j + HALF] = qs[j] >> 4;
    }
    codes
}

impl BlockCodec for Q4_0Quantizer {
    const QTYPE: QuantizationType = QuantizationType::Q4_0;
    const BLOCK_BYTES: usize = 2 + HALF;

    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats {
        // d carries the sign of the extreme value, which therefore maps to code 0.
        let (_, max) = abs_max_signed(x);
        let d = max / -8.0;
        let id = inverse(d);

        let mut codes = [0u8; QK];
        for (c, &v) in codes.iter_mut().zip(x) {
            *c = ((v * id + 8.5) as i8).clamp(0, 15) as u8;
        }

        write_f16(out, d);
        pack_nibbles(&codes, &mut out[2..]);
        BlockStats { scale: d, min: None, bins: codes }
    }

    fn decode_block(block: &[u8], out: &mut [f32; QK]) {
        let d = read_f16(block);
        for (o, q) in out.iter_mut().zip(unpack_nibbles(&block[2..])) {
            *o = (q as i32 - 8) as f32 * d;
        }
    }
}

impl BlockCodec for Q4_1Quantizer {
    const QTYPE: QuantizationType = QuantizationType::Q4_1;
    const BLOCK_BYTES: usize = 4 + HALF;

    fn encode_block(x: &[f32; QK], out: &mut [u8]) -> BlockStats {
        let (min, max) = min_max(x);
        let d = (max - min) / 15.0;
        let id = inverse(d);

        let mut codes = [0u8; QK];
        for (c, &v) in codes.iter_mut().zip(x) {
            *c = (((v - min) * id + 0.5) as i8).clamp(0, 15) as u8;
        }

        write_f16(out, d);
        write_f16(&mut out[2..], min);
        pack_nibbles(&codes, &mut out[4..]);
        BlockStats { scale: d, min: Some(min), bins: codes }
    }

    fn decode_block(block: &[u8], out: &mut [f32; QK]) {
        let d = read_f16(block);
        let m = read_f16(&block[2..]);
        for (o, q) in out.iter_mut().zip(unpack_nibbles(&block[4..])) {
            *o = q as f32 * d + m;
        }
    }
}

impl_block_quantizer!(Q4_0Quantizer);
impl_block_quantizer!(Q4_1Quantizer);
