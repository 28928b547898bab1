//! Element-type and target-type enumerations.
//!
//! Two enumerations are kept apart on purpose: [`GgmlType`] is what a tensor
//! record *declares* its payload to be, while [`QuantizationType`] is what the
//! caller asked the converter to produce. A copied tensor keeps its
//! `GgmlType`; a quantized tensor gets `QuantizationType::ggml_type()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-tensor element type, numbered as in the GGML tensor-type table.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
#[non_exhaustive]
pub enum GgmlType {
    F32 = 0,
    F16 = 1,
    Q4_0 = 2,
    Q4_1 = 3,
    Q5_0 = 6,
    Q5_1 = 7,
    Q8_0 = 8,
    Q8_1 = 9,
    Q2_K = 10,
    Q3_K = 11,
    Q4_K = 12,
    Q5_K = 13,
    Q6_K = 14,
    Q8_K = 15,
    I8 = 16,
    I16 = 17,
    I32 = 18,
}

impl GgmlType {
    /// All known element types, in id order.
    pub const ALL: [GgmlType; 17] = [
        Self::F32,
        Self::F16,
        Self::Q4_0,
        Self::Q4_1,
        Self::Q5_0,
        Self::Q5_1,
        Self::Q8_0,
        Self::Q8_1,
        Self::Q2_K,
        Self::Q3_K,
        Self::Q4_K,
        Self::Q5_K,
        Self::Q6_K,
        Self::Q8_K,
        Self::I8,
        Self::I16,
        Self::I32,
    ];

    /// Convert from the raw i32 tag stored in a tensor record.
    pub const fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::F32),
            1 => Some(Self::F16),
            2 => Some(Self::Q4_0),
            3 => Some(Self::Q4_1),
            6 => Some(Self::Q5_0),
            7 => Some(Self::Q5_1),
            8 => Some(Self::Q8_0),
            9 => Some(Self::Q8_1),
            10 => Some(Self::Q2_K),
            11 => Some(Self::Q3_K),
            12 => Some(Self::Q4_K),
            13 => Some(Self::Q5_K),
            14 => Some(Self::Q6_K),
            15 => Some(Self::Q8_K),
            16 => Some(Self::I8),
            17 => Some(Self::I16),
            18 => Some(Self::I32),
            _ => None,
        }
    }

    #[inline]
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Number of elements stored per block (1 for scalar types).
    pub const fn block_size(self) -> usize {
        match self {
            Self::F32 | Self::F16 | Self::I8 | Self::I16 | Self::I32 => 1,
            Self::Q4_0 | Self::Q4_1 | Self::Q5_0 | Self::Q5_1 | Self::Q8_0 | Self::Q8_1 => 32,
            Self::Q2_K | Self::Q3_K | Self::Q4_K | Self::Q5_K | Self::Q6_K | Self::Q8_K => 256,
        }
    }

    /// Bytes occupied by one block.
    pub const fn block_bytes(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F16 | Self::I16 => 2,
            Self::I8 => 1,
            Self::Q4_0 => 18,
            Self::Q4_1 => 20,
            Self::Q5_0 => 22,
            Self::Q5_1 => 24,
            Self::Q8_0 => 34,
            Self::Q8_1 => 40,
            Self::Q2_K => 84,
            Self::Q3_K => 110,
            Self::Q4_K => 144,
            Self::Q5_K => 176,
            Self::Q6_K => 210,
            Self::Q8_K => 292,
        }
    }

    /// Payload length in bytes for `n_elements` values of this type.
    ///
    /// A trailing partial block occupies a whole block. Returns `None` on
    /// overflow.
    pub fn payload_size(self, n_elements: usize) -> Option<usize> {
        n_elements.div_ceil(self.block_size()).checked_mul(self.block_bytes())
    }

    pub const fn is_quantized(self) -> bool {
        self.block_size() > 1
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F16)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::Q4_0 => "q4_0",
            Self::Q4_1 => "q4_1",
            Self::Q5_0 => "q5_0",
            Self::Q5_1 => "q5_1",
            Self::Q8_0 => "q8_0",
            Self::Q8_1 => "q8_1",
            Self::Q2_K => "q2_K",
            Self::Q3_K => "q3_K",
            Self::Q4_K => "q4_K",
            Self::Q5_K => "q5_K",
            Self::Q6_K => "q6_K",
            Self::Q8_K => "q8_K",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
        }
    }
}

impl fmt::Display for GgmlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target encoding requested by the caller.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationType {
    Q4_0,
    Q4_1,
    Q5_0,
    Q5_1,
    Q8_0,
}

impl QuantizationType {
    pub const ALL: [QuantizationType; 5] =
        [Self::Q4_0, Self::Q4_1, Self::Q5_0, Self::Q5_1, Self::Q8_0];

    /// File-type id written into the hyperparameter block.
    pub const fn ftype(self) -> i32 {
        match self {
            Self::Q4_0 => 2,
            Self::Q4_1 => 3,
            Self::Q8_0 => 7,
            Self::Q5_0 => 8,
            Self::Q5_1 => 9,
        }
    }

    /// Resolve a file-type id back to a target type.
    pub const fn from_ftype(ftype: i32) -> Option<Self> {
        match ftype {
            2 => Some(Self::Q4_0),
            3 => Some(Self::Q4_1),
            7 => Some(Self::Q8_0),
            8 => Some(Self::Q5_0),
            9 => Some(Self::Q5_1),
            _ => None,
        }
    }

    /// Element type stamped on tensors encoded with this target.
    pub const fn ggml_type(self) -> GgmlType {
        match self {
            Self::Q4_0 => GgmlType::Q4_0,
            Self::Q4_1 => GgmlType::Q4_1,
            Self::Q5_0 => GgmlType::Q5_0,
            Self::Q5_1 => GgmlType::Q5_1,
            Self::Q8_0 => GgmlType::Q8_0,
        }
    }

    pub const fn name(self) -> &'static str {
        self.ggml_type().name()
    }

    /// Packed output size for `n_elements` values.
    pub fn expected_size(self, n_elements: usize) -> Option<usize> {
        self.ggml_type().payload_size(n_elements)
    }
}

impl fmt::Display for QuantizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for a target-type string that names no supported encoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quantization type `{0}` (expected q4_0, q4_1, q5_0, q5_1, q8_0 or 2, 3, 8, 9, 7)")]
pub struct UnknownQuantizationType(pub String);

impl FromStr for QuantizationType {
    type Err = UnknownQuantizationType;

    /// Accepts a symbolic name (case-insensitive) or a numeric file-type id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            return s
                .parse::<i32>()
                .ok()
                .and_then(Self::from_ftype)
                .ok_or_else(|| UnknownQuantizationType(s.to_string()));
        }
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|q| q.name() == lower)
            .ok_or_else(|| UnknownQuantizationType(s.to_string()))
    }
}
