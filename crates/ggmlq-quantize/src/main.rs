//! Legacy GGML checkpoint quantizer
//!
//! # Usage
//!
//! ```bash
//! # Quantize every 2-D `*weight` tensor to Q4_0
//! ggmlq-quantize model-f32.bin model-q4_0.bin q4_0
//!
//! # Numeric file-type ids work too (8 = q5_0)
//! ggmlq-quantize model-f32.bin model-q5_0.bin 8
//!
//! # Files written by the GGML converter scripts use the dims-first layout
//! ggmlq-quantize model-f16.bin model-q8_0.bin q8_0 --record-layout dims-first
//!
//! # Keep embeddings in full precision and print a JSON report
//! ggmlq-quantize in.bin out.bin q4_1 --exclude 'tok_emb.*' --json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use ggmlq_format::{QuantizationType, RecordLayout};
use ggmlq_quantize::exit::{EXIT_GENERIC_FAIL, EXIT_SUCCESS, EXIT_USAGE};
use ggmlq_quantize::{QuantizeConfig, QuantizeError, quantize_model};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const TYPE_TABLE: &str = "\
Quantization types:
  q4_0  (2)  4-bit, scale per 32 values
  q4_1  (3)  4-bit, scale and minimum per 32 values
  q5_0  (8)  5-bit, scale per 32 values
  q5_1  (9)  5-bit, scale and minimum per 32 values
  q8_0  (7)  8-bit, scale per 32 values";

/// Quantize a legacy GGML checkpoint
#[derive(Parser, Debug)]
#[command(name = "ggmlq-quantize")]
#[command(about = "Quantize an f32/f16 legacy GGML checkpoint to a block format")]
#[command(version, after_help = TYPE_TABLE)]
struct Args {
    /// Input checkpoint
    input: PathBuf,

    /// Output checkpoint (overwritten)
    output: PathBuf,

    /// Target type, by name or file-type id
    #[arg(value_name = "TYPE")]
    qtype: QuantizationType,

    /// Whole-name regex selecting tensors to quantize
    /// (repeatable, replaces the default `.*weight`)
    #[arg(long, value_name = "REGEX")]
    include: Vec<String>,

    /// Whole-name regex excluding tensors from quantization (repeatable)
    #[arg(long, value_name = "REGEX")]
    exclude: Vec<String>,

    /// Required tensor rank for quantization; 0 accepts any rank
    #[arg(long, value_name = "N")]
    quantize_rank: Option<usize>,

    /// Record header layout: name-first or dims-first
    #[arg(long, value_name = "LAYOUT")]
    record_layout: Option<RecordLayout>,

    /// TOML file with a [quantize] table
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the conversion report as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<QuantizeConfig> {
        let mut config = match &self.config {
            Some(path) => QuantizeConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => QuantizeConfig::default(),
        };
        if !self.include.is_empty() {
            config.include = self.include.clone();
        }
        config.exclude.extend(self.exclude.iter().cloned());
        if let Some(rank) = self.quantize_rank {
            config.quantize_rank = rank;
        }
        if let Some(layout) = self.record_layout {
            config.record_layout = layout;
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS as u8),
        Err(err) => {
            tracing::error!("{err:#}");
            let code = err
                .downcast_ref::<QuantizeError>()
                .map_or(EXIT_GENERIC_FAIL, QuantizeError::exit_code);
            // usage errors are raised before the output is opened
            if code != EXIT_GENERIC_FAIL && code != EXIT_USAGE && args.output.exists() {
                tracing::warn!(
                    "{} is incomplete and not a valid checkpoint",
                    args.output.display()
                );
            }
            ExitCode::from(code as u8)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let t_start = Instant::now();
    let config = args.resolve_config()?;

    tracing::info!("Input: {}", args.input.display());
    tracing::info!("Output: {}", args.output.display());
    tracing::info!("Target: {} (ftype {})", args.qtype, args.qtype.ftype());
    tracing::info!("Record layout: {}", config.record_layout);

    let t_quantize = Instant::now();
    let report = quantize_model(&args.input, &args.output, args.qtype, &config).with_context(|| {
        format!("failed to quantize {} -> {}", args.input.display(), args.output.display())
    })?;
    let quantize_ms = t_quantize.elapsed().as_secs_f64() * 1000.0;

    let stats = &report.stats;
    tracing::info!(
        "Tensors: {} ({} quantized, {} copied)",
        stats.tensors,
        stats.quantized,
        stats.copied
    );
    tracing::info!(
        "Quantized size: {:.2} MB -> {:.2} MB (x{:.2})",
        stats.original_bytes as f64 / 1024.0 / 1024.0,
        stats.quantized_bytes as f64 / 1024.0 / 1024.0,
        stats.compression_ratio()
    );
    let hist = stats.histogram_fractions().map(|f| format!("{f:.3}")).join(" ");
    tracing::info!("Histogram: {hist}");
    tracing::info!("Quantize time: {quantize_ms:.2} ms");
    tracing::info!("Total time: {:.2} ms", t_start.elapsed().as_secs_f64() * 1000.0);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn cli_flags_override_defaults() {
        let args = Args::try_parse_from([
            "ggmlq-quantize",
            "in.bin",
            "out.bin",
            "Q5_1",
            "--include",
            ".*proj",
            "--exclude",
            "skip.*",
            "--record-layout",
            "dims-first",
            "--quantize-rank",
            "0",
        ])
        .unwrap();
        assert_eq!(args.qtype, QuantizationType::Q5_1);
        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.include, vec![".*proj".to_string()]);
        assert_eq!(cfg.exclude, vec!["skip.*".to_string()]);
        assert_eq!(cfg.quantize_rank, 0);
        assert_eq!(cfg.record_layout, RecordLayout::DimsFirst);
    }

    #[test]
    fn numeric_type_id() {
        let args = Args::try_parse_from(["ggmlq-quantize", "a", "b", "7"]).unwrap();
        assert_eq!(args.qtype, QuantizationType::Q8_0);
        assert!(Args::try_parse_from(["ggmlq-quantize", "a", "b", "q3_k"]).is_err());
    }
}
