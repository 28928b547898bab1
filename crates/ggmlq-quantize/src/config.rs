//! Conversion settings: built-in defaults, an optional TOML file, then CLI
//! flags on top.
//!
//! ```toml
//! [quantize]
//! include = [".*weight"]
//! exclude = [".*norm\\.weight"]
//! quantize_rank = 2        # 0 accepts any rank
//! record_layout = "dims-first"
//! ```

use crate::error::{QuantizeError, Result};
use crate::rules::{DEFAULT_INCLUDE, DEFAULT_RANK, QuantizationRules};
use ggmlq_format::RecordLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuantizeConfig {
    /// Whole-name patterns selecting tensors to quantize.
    pub include: Vec<String>,
    /// Whole-name patterns that veto a match.
    pub exclude: Vec<String>,
    /// Required tensor rank; 0 disables the check.
    pub quantize_rank: usize,
    pub record_layout: RecordLayout,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            include: vec![DEFAULT_INCLUDE.to_string()],
            exclude: Vec::new(),
            quantize_rank: DEFAULT_RANK,
            record_layout: RecordLayout::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    quantize: QuantizeConfig,
}

impl QuantizeConfig {
    /// Parse the `[quantize]` table of a TOML document. A document without
    /// the table yields the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s)?;
        Ok(file.quantize)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            QuantizeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Compile the pattern sets.
    pub fn rules(&self) -> Result<QuantizationRules> {
        let rank = (self.quantize_rank != 0).then_some(self.quantize_rank);
        Ok(QuantizationRules::new(&self.include, &self.exclude, rank)?)
    }
}
