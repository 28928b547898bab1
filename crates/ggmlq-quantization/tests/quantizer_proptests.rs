//! Property tests shared by every block quantizer.

use ggmlq_format::QuantizationType;
use ggmlq_quantization::{QK, QuantizerFactory, expected_size};
use proptest::prelude::*;

fn arb_qtype() -> impl Strategy<Value = QuantizationType> {
    proptest::sample::select(QuantizationType::ALL.to_vec())
}

fn arb_values() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-100.0f32..100.0, 0..200)
}

proptest! {
    #[test]
    fn packed_size_law(qtype in arb_qtype(), values in arb_values()) {
        let qt = QuantizerFactory::create(qtype).quantize(&values).unwrap();
        prop_assert_eq!(Some(qt.data.len()), expected_size(qtype, values.len()));
        prop_assert_eq!(qt.scales.len(), values.len().div_ceil(QK));
        prop_assert_eq!(qt.histogram.iter().sum::<u64>(), values.len() as u64);
    }

    #[test]
    fn dequantize_restores_length(qtype in arb_qtype(), values in arb_values()) {
        let q = QuantizerFactory::create(qtype);
        let back = q.dequantize(&q.quantize(&values).unwrap()).unwrap();
        prop_assert_eq!(back.len(), values.len());
    }

    #[test]
    fn error_bounded_by_block_range(qtype in arb_qtype(), values in arb_values()) {
        let q = QuantizerFactory::create(qtype);
        let back = q.dequantize(&q.quantize(&values).unwrap()).unwrap();
        for (orig, deq) in values.chunks(QK).zip(back.chunks(QK)) {
            // zero padding widens the range of a short tail block
            let lo = orig.iter().copied().fold(0.0f32, f32::min);
            let hi = orig.iter().copied().fold(0.0f32, f32::max);
            let range = hi - lo;
            for (o, r) in orig.iter().zip(deq) {
                prop_assert!(
                    (o - r).abs() <= range * 0.25 + 1e-3,
                    "{} vs {} (range {})",
                    o,
                    r,
                    range
                );
            }
        }
    }
}
