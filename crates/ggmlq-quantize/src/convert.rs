//! Whole-checkpoint conversion: header, hyperparameters, vocabulary, then the
//! tensor section.

use crate::config::QuantizeConfig;
use crate::engine::{QuantizationStats, TensorQuantizer};
use crate::error::Result;
use crate::rules::QuantizationRules;
use ggmlq_format::{Hparams, QuantizationType, RecordLayout, StreamHeader, Vocabulary};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Summary of a finished conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub header: StreamHeader,
    /// Hyperparameters as read; the output differs only in `ftype`.
    pub hparams: Hparams,
    pub n_vocab: usize,
    pub target: QuantizationType,
    pub record_layout: RecordLayout,
    pub stats: QuantizationStats,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

struct Counting<T> {
    inner: T,
    count: u64,
}

impl<T> Counting<T> {
    fn new(inner: T) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

impl<W: Write> Write for Counting<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Convert one checkpoint stream.
///
/// On error the writer holds a partial, invalid checkpoint.
pub fn quantize_stream<R: Read, W: Write>(
    r: R,
    w: W,
    target: QuantizationType,
    config: &QuantizeConfig,
) -> Result<ConversionReport> {
    convert(r, w, target, config.rules()?, config.record_layout)
}

/// Convert `input` into a new file at `output`.
///
/// The rules are compiled before `output` is opened, so a configuration
/// error leaves an existing file untouched.
pub fn quantize_model(
    input: &Path,
    output: &Path,
    target: QuantizationType,
    config: &QuantizeConfig,
) -> Result<ConversionReport> {
    let rules = config.rules()?;
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let report = convert(reader, &mut writer, target, rules, config.record_layout)?;
    writer.flush()?;
    Ok(report)
}

fn convert<R: Read, W: Write>(
    r: R,
    w: W,
    target: QuantizationType,
    rules: QuantizationRules,
    record_layout: RecordLayout,
) -> Result<ConversionReport> {
    let mut r = Counting::new(r);
    let mut w = Counting::new(w);

    let header = StreamHeader::transcode(&mut r, &mut w)?;
    let hparams = Hparams::transcode(&mut r, &mut w, target)?;
    let vocab = Vocabulary::transcode(&mut r, &mut w, hparams.n_vocab)?;
    tracing::info!(entries = vocab.len(), "vocabulary");

    let engine = TensorQuantizer::new(target, rules, record_layout);
    let stats = engine.run(&mut r, &mut w)?;
    w.flush()?;

    Ok(ConversionReport {
        header,
        hparams,
        n_vocab: vocab.len(),
        target,
        record_layout,
        stats,
        bytes_read: r.count,
        bytes_written: w.count,
    })
}
