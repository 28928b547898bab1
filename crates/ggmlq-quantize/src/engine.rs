//! The tensor loop: read a record, copy it through or quantize it, repeat
//! until the stream ends at a record boundary.

use crate::error::{QuantizeError, Result};
use crate::rules::QuantizationRules;
use ggmlq_format::io::read_bytes;
use ggmlq_format::{GgmlType, QuantizationType, RecordLayout, TensorHeader};
use ggmlq_quantization::{HIST_BINS, Histogram, QuantizerFactory, QuantizerTrait};
use half::f16;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Accounting for one pass over the tensor section.
#[derive(Debug, Clone, Serialize)]
pub struct QuantizationStats {
    pub target: QuantizationType,
    /// Records seen.
    pub tensors: usize,
    pub quantized: usize,
    pub copied: usize,
    /// Input payload bytes of quantized tensors.
    pub original_bytes: u64,
    /// Output payload bytes of quantized tensors.
    pub quantized_bytes: u64,
    /// Payload bytes of copied tensors.
    pub copied_bytes: u64,
    /// Output records per element type.
    pub dtype_counts: BTreeMap<&'static str, usize>,
    /// Quantized-code histogram summed over all quantized tensors.
    pub histogram: Histogram,
}

impl QuantizationStats {
    pub fn new(target: QuantizationType) -> Self {
        Self {
            target,
            tensors: 0,
            quantized: 0,
            copied: 0,
            original_bytes: 0,
            quantized_bytes: 0,
            copied_bytes: 0,
            dtype_counts: BTreeMap::new(),
            histogram: [0; HIST_BINS],
        }
    }

    /// Input over output size of the quantized tensors.
    pub fn compression_ratio(&self) -> f64 {
        if self.quantized_bytes == 0 {
            return 1.0;
        }
        self.original_bytes as f64 / self.quantized_bytes as f64
    }

    /// Histogram normalized to fractions of all quantized elements.
    pub fn histogram_fractions(&self) -> [f64; HIST_BINS] {
        let total: u64 = self.histogram.iter().sum();
        if total == 0 {
            return [0.0; HIST_BINS];
        }
        self.histogram.map(|c| c as f64 / total as f64)
    }

    fn record(&mut self, dtype: GgmlType) {
        self.tensors += 1;
        *self.dtype_counts.entry(dtype.name()).or_default() += 1;
    }
}

/// Streams tensor records from a reader to a writer, quantizing the ones the
/// rules select.
pub struct TensorQuantizer {
    rules: QuantizationRules,
    layout: RecordLayout,
    quantizer: Box<dyn QuantizerTrait>,
}

impl TensorQuantizer {
    pub fn new(target: QuantizationType, rules: QuantizationRules, layout: RecordLayout) -> Self {
        Self { rules, layout, quantizer: QuantizerFactory::create(target) }
    }

    pub fn target(&self) -> QuantizationType {
        self.quantizer.quantization_type()
    }

    pub fn rules(&self) -> &QuantizationRules {
        &self.rules
    }

    /// Process records until the input is exhausted.
    ///
    /// Memory use is bounded by one payload and its encoded form.
    pub fn run<R: Read + ?Sized, W: Write + ?Sized>(
        &self,
        r: &mut R,
        w: &mut W,
    ) -> Result<QuantizationStats> {
        let mut stats = QuantizationStats::new(self.target());
        while let Some(header) = TensorHeader::read(r, self.layout)? {
            let payload = read_bytes(r, header.payload_len()?, "tensor payload")?;

            if self.rules.should_quantize(&header) {
                self.quantize_record(&header, &payload, w, &mut stats)?;
            } else {
                tracing::debug!(name = %header.name_lossy(), dims = ?header.dims, "copied");
                header.write(w, self.layout)?;
                w.write_all(&payload)?;
                stats.copied += 1;
                stats.copied_bytes += payload.len() as u64;
                stats.record(header.dtype);
            }
        }
        Ok(stats)
    }

    fn quantize_record<W: Write + ?Sized>(
        &self,
        header: &TensorHeader,
        payload: &[u8],
        w: &mut W,
        stats: &mut QuantizationStats,
    ) -> Result<()> {
        let target = self.target();
        let values = widen(header, payload)?;
        let packed = self.quantizer.quantize(&values)?;

        let expected = target.expected_size(values.len()).ok_or_else(|| {
            QuantizeError::EncodingFailure(format!(
                "tensor `{}` is too large for {target}",
                header.name_lossy()
            ))
        })?;
        if packed.data.len() != expected {
            return Err(QuantizeError::EncodingFailure(format!(
                "tensor `{}`: {target} encoder produced {} bytes, expected {expected}",
                header.name_lossy(),
                packed.data.len()
            )));
        }

        let out = header.with_dtype(target.ggml_type());
        out.write(w, self.layout)?;
        w.write_all(&packed.data)?;

        tracing::info!(
            name = %header.name_lossy(),
            dims = ?header.dims,
            dtype = %header.dtype,
            before = payload.len(),
            after = packed.data.len(),
            "quantized"
        );

        stats.quantized += 1;
        stats.original_bytes += payload.len() as u64;
        stats.quantized_bytes += packed.data.len() as u64;
        for (total, n) in stats.histogram.iter_mut().zip(packed.histogram) {
            *total += n;
        }
        stats.record(out.dtype);
        Ok(())
    }
}

/// Decode an F32 or F16 payload into f32 values.
fn widen(header: &TensorHeader, payload: &[u8]) -> Result<Vec<f32>> {
    match header.dtype {
        GgmlType::F32 => Ok(payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()),
        GgmlType::F16 => {
            Ok(payload.chunks_exact(2).map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32()).collect())
        }
        other => Err(QuantizeError::UnsupportedType(format!(
            "tensor `{}` has element type {other}; only f32 and f16 can be quantized",
            header.name_lossy()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(header: &TensorHeader, payload: &[u8], layout: RecordLayout) -> Vec<u8> {
        let mut buf = Vec::new();
        header.write(&mut buf, layout).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn empty_section_is_a_clean_exit() {
        let engine = TensorQuantizer::new(
            QuantizationType::Q4_0,
            QuantizationRules::weights_only(),
            RecordLayout::NameFirst,
        );
        let mut out = Vec::new();
        let stats = engine.run(&mut Cursor::new(Vec::new()), &mut out).unwrap();
        assert_eq!(stats.tensors, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn f16_payload_is_widened() {
        let header = TensorHeader::new("w.weight", vec![32, 1], GgmlType::F16);
        let payload: Vec<u8> =
            (0..32).flat_map(|i| f16::from_f32(i as f32).to_le_bytes()).collect();
        let values = widen(&header, &payload).unwrap();
        assert_eq!(values.len(), 32);
        assert_eq!(values[31], 31.0);
    }

    #[test]
    fn integer_tensor_cannot_be_quantized() {
        let header = TensorHeader::new("idx.weight", vec![2, 2], GgmlType::I32);
        let input = record(&header, &[0u8; 16], RecordLayout::NameFirst);
        let engine = TensorQuantizer::new(
            QuantizationType::Q8_0,
            QuantizationRules::weights_only(),
            RecordLayout::NameFirst,
        );
        let err = engine.run(&mut Cursor::new(input), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, QuantizeError::UnsupportedType(_)), "{err}");
    }

    #[test]
    fn stats_track_both_paths() {
        let layout = RecordLayout::DimsFirst;
        let mut input = record(
            &TensorHeader::new("a.weight", vec![32, 2], GgmlType::F32),
            &f32_bytes(&[0.25; 64]),
            layout,
        );
        input.extend(record(
            &TensorHeader::new("a.bias", vec![32], GgmlType::F32),
            &f32_bytes(&[1.0; 32]),
            layout,
        ));

        let engine =
            TensorQuantizer::new(QuantizationType::Q8_0, QuantizationRules::weights_only(), layout);
        let mut out = Vec::new();
        let stats = engine.run(&mut Cursor::new(input), &mut out).unwrap();

        assert_eq!((stats.tensors, stats.quantized, stats.copied), (2, 1, 1));
        assert_eq!(stats.original_bytes, 256);
        assert_eq!(stats.quantized_bytes, 68);
        assert_eq!(stats.copied_bytes, 128);
        assert_eq!(stats.dtype_counts.get("q8_0"), Some(&1));
        assert_eq!(stats.dtype_counts.get("f32"), Some(&1));
        assert_eq!(stats.histogram.iter().sum::<u64>(), 64);
        assert!((stats.compression_ratio() - 256.0 / 68.0).abs() < 1e-9);
        assert!((stats.histogram_fractions().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
