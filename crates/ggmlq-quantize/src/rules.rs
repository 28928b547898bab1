//! Name-pattern rules deciding which tensors get quantized.
//!
//! Patterns are matched against the whole tensor name, so `.*weight` accepts
//! `layers.0.attn.weight` but not `layers.0.attn.weight_scale`.

use ggmlq_format::TensorHeader;
use regex::Regex;
use std::sync::OnceLock;

/// Inclusion pattern of the default rule set.
pub const DEFAULT_INCLUDE: &str = ".*weight";

/// Only matrices are quantized by default.
pub const DEFAULT_RANK: usize = 2;

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Inclusion/exclusion pattern sets plus an optional required rank.
#[derive(Debug, Clone)]
pub struct QuantizationRules {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    rank: Option<usize>,
}

static WEIGHTS_ONLY: OnceLock<QuantizationRules> = OnceLock::new();

impl QuantizationRules {
    pub fn new<I, E>(include: I, exclude: E, rank: Option<usize>) -> Result<Self, regex::Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let include = include.into_iter().map(|p| anchored(p.as_ref())).collect::<Result<_, _>>()?;
        let exclude = exclude.into_iter().map(|p| anchored(p.as_ref())).collect::<Result<_, _>>()?;
        Ok(Self { include, exclude, rank })
    }

    /// `.*weight`, no exclusions, rank 2.
    pub fn weights_only() -> Self {
        WEIGHTS_ONLY
            .get_or_init(|| Self {
                include: vec![anchored(DEFAULT_INCLUDE).expect("built-in pattern must compile")],
                exclude: Vec::new(),
                rank: Some(DEFAULT_RANK),
            })
            .clone()
    }

    /// Name matches some inclusion pattern and no exclusion pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.include.iter().any(|re| re.is_match(name))
            && !self.exclude.iter().any(|re| re.is_match(name))
    }

    /// Whether the record described by `header` should be quantized.
    pub fn should_quantize(&self, header: &TensorHeader) -> bool {
        self.matches(&header.name_lossy()) && self.rank.is_none_or(|rank| header.n_dims() == rank)
    }

    pub fn rank(&self) -> Option<usize> {
        self.rank
    }

    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(Regex::as_str)
    }

    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(Regex::as_str)
    }
}

impl Default for QuantizationRules {
    fn default() -> Self {
        Self::weights_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ggmlq_format::GgmlType;

    fn matrix(name: &str) -> TensorHeader {
        TensorHeader::new(name, vec![4, 4], GgmlType::F32)
    }

    #[test]
    fn default_matches_whole_name() {
        let rules = QuantizationRules::weights_only();
        assert!(rules.matches("layers.0.attn.weight"));
        assert!(rules.matches("weight"));
        assert!(!rules.matches("layers.0.attn.weight_scale"));
        assert!(!rules.matches("pos_emb"));
        assert!(!rules.matches("layers.0.attn.bias"));
    }

    #[test]
    fn rank_is_enforced() {
        let rules = QuantizationRules::weights_only();
        assert!(rules.should_quantize(&matrix("ln.weight")));
        let vector = TensorHeader::new("ln.weight", vec![16], GgmlType::F32);
        assert!(!rules.should_quantize(&vector));

        let any_rank =
            QuantizationRules::new([DEFAULT_INCLUDE], Vec::<String>::new(), None).unwrap();
        assert!(any_rank.should_quantize(&vector));
    }

    #[test]
    fn exclusions_win() {
        let rules =
            QuantizationRules::new([".*weight"], [r".*norm\.weight", "tok_emb.*"], Some(2))
                .unwrap();
        assert!(rules.should_quantize(&matrix("layers.1.mlp.weight")));
        assert!(!rules.should_quantize(&matrix("layers.1.norm.weight")));
        assert!(!rules.should_quantize(&matrix("tok_emb.weight")));
    }

    #[test]
    fn alternation_is_anchored_as_a_group() {
        let rules = QuantizationRules::new(["a|b"], Vec::<String>::new(), None).unwrap();
        assert!(rules.matches("a"));
        assert!(rules.matches("b"));
        assert!(!rules.matches("ab"));
        assert_eq!(rules.include_patterns().collect::<Vec<_>>(), ["^(?:a|b)$"]);
    }

    #[test]
    fn bad_pattern_is_rejected() {
        assert!(QuantizationRules::new(["(unclosed"], Vec::<String>::new(), None).is_err());
    }
}
