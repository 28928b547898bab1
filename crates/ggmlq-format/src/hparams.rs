//! Fixed-layout model hyperparameters.

use crate::error::Result;
use crate::io::{read_i32, write_i32};
use crate::types::QuantizationType;
use serde::Serialize;
use std::io::{Read, Write};

/// Number of i32 fields in the hyperparameter block.
pub const HPARAMS_FIELDS: usize = 8;

/// Model hyperparameters, in wire order.
///
/// Values are carried as-is; nothing here is range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Hparams {
    pub n_vocab: i32,
    pub n_ctx: i32,
    pub n_embd: i32,
    pub n_head: i32,
    pub n_layer: i32,
    pub n_rot: i32,
    pub use_parallel_residual: i32,
    pub ftype: i32,
}

impl Hparams {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = HPARAMS_FIELDS * 4;

    fn fields(&self) -> [(&'static str, i32); HPARAMS_FIELDS] {
        [
            ("n_vocab", self.n_vocab),
            ("n_ctx", self.n_ctx),
            ("n_embd", self.n_embd),
            ("n_head", self.n_head),
            ("n_layer", self.n_layer),
            ("n_rot", self.n_rot),
            ("use_parallel_residual", self.use_parallel_residual),
            ("ftype", self.ftype),
        ]
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        Ok(Self {
            n_vocab: read_i32(r, "hparams.n_vocab")?,
            n_ctx: read_i32(r, "hparams.n_ctx")?,
            n_embd: read_i32(r, "hparams.n_embd")?,
            n_head: read_i32(r, "hparams.n_head")?,
            n_layer: read_i32(r, "hparams.n_layer")?,
            n_rot: read_i32(r, "hparams.n_rot")?,
            use_parallel_residual: read_i32(r, "hparams.use_parallel_residual")?,
            ftype: read_i32(r, "hparams.ftype")?,
        })
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        for (_, v) in self.fields() {
            write_i32(w, v)?;
        }
        Ok(())
    }

    /// Copy with the file-type field replaced by `target`'s id.
    #[must_use]
    pub fn with_target(self, target: QuantizationType) -> Self {
        Self { ftype: target.ftype(), ..self }
    }

    /// Read the block and write it back with `ftype` set to the target.
    ///
    /// Returns the hyperparameters as they were read.
    pub fn transcode<R: Read + ?Sized, W: Write + ?Sized>(
        r: &mut R,
        w: &mut W,
        target: QuantizationType,
    ) -> Result<Self> {
        let hparams = Self::read(r)?;
        for (field, value) in hparams.fields() {
            tracing::info!(field, value, "hparams");
        }
        hparams.with_target(target).write(w)?;
        Ok(hparams)
    }
}
