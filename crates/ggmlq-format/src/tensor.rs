//! Tensor record headers.
//!
//! A record is a header (name, shape, element type) followed by a payload of
//! `GgmlType::payload_size(element_count)` bytes. The payload length is never
//! stored; it is always derived from the header.

use crate::error::{FormatError, Result};
use crate::io::{read_bytes, read_exact_or_eof, read_i32, read_u32, write_i32, write_u32};
use crate::types::GgmlType;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

/// Largest rank a record may declare.
pub const MAX_DIMS: usize = 4;

/// Field order of a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordLayout {
    /// `name_len:u32 name n_dims:u32 dims:i32[n_dims] dtype:i32`
    #[default]
    NameFirst,
    /// `n_dims:i32 name_len:i32 dtype:i32 dims:i32[n_dims] name`, as written
    /// by the GGML converter scripts.
    DimsFirst,
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameFirst => write!(f, "name-first"),
            Self::DimsFirst => write!(f, "dims-first"),
        }
    }
}

impl FromStr for RecordLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name-first" => Ok(Self::NameFirst),
            "dims-first" => Ok(Self::DimsFirst),
            other => Err(format!(
                "unknown record layout `{other}` (expected name-first or dims-first)"
            )),
        }
    }
}

/// Header of one tensor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorHeader {
    /// Raw name bytes, carried through unchanged. Not necessarily UTF-8.
    pub name: Vec<u8>,
    /// Dimension sizes, innermost first.
    pub dims: Vec<i32>,
    pub dtype: GgmlType,
}

fn check_n_dims(n_dims: i64) -> Result<usize> {
    if !(1..=MAX_DIMS as i64).contains(&n_dims) {
        return Err(FormatError::invalid(format!(
            "tensor rank {n_dims} outside 1..={MAX_DIMS}"
        )));
    }
    Ok(n_dims as usize)
}

fn decode_dtype(raw: i32) -> Result<GgmlType> {
    GgmlType::from_i32(raw).ok_or(FormatError::UnsupportedType { id: raw })
}

impl TensorHeader {
    pub fn new(name: impl Into<Vec<u8>>, dims: Vec<i32>, dtype: GgmlType) -> Self {
        Self { name: name.into(), dims, dtype }
    }

    /// Name for matching and display; invalid UTF-8 becomes U+FFFD.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn n_dims(&self) -> usize {
        self.dims.len()
    }

    /// Product of all dimensions.
    pub fn n_elements(&self) -> Result<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| {
            let d = usize::try_from(d).map_err(|_| {
                FormatError::invalid(format!(
                    "tensor `{}` has negative dim {d}",
                    self.name_lossy()
                ))
            })?;
            acc.checked_mul(d).ok_or_else(|| {
                FormatError::invalid(format!(
                    "tensor `{}` element count overflows",
                    self.name_lossy()
                ))
            })
        })
    }

    /// Payload length implied by shape and element type.
    pub fn payload_len(&self) -> Result<usize> {
        let n = self.n_elements()?;
        self.dtype.payload_size(n).ok_or_else(|| {
            FormatError::invalid(format!("tensor `{}` payload size overflows", self.name_lossy()))
        })
    }

    /// Copy with a different element type.
    #[must_use]
    pub fn with_dtype(&self, dtype: GgmlType) -> Self {
        Self { dtype, ..self.clone() }
    }

    /// Read the next header, or `None` when the stream ends cleanly at a
    /// record boundary.
    pub fn read<R: Read + ?Sized>(r: &mut R, layout: RecordLayout) -> Result<Option<Self>> {
        let mut first = [0u8; 4];
        if !read_exact_or_eof(r, &mut first, "tensor header")? {
            return Ok(None);
        }

        let header = match layout {
            RecordLayout::NameFirst => {
                let name_len = u32::from_le_bytes(first) as usize;
                let name = read_bytes(r, name_len, "tensor name")?;
                let n_dims = check_n_dims(read_u32(r, "tensor n_dims")? as i64)?;
                let mut dims = Vec::with_capacity(n_dims);
                for _ in 0..n_dims {
                    dims.push(read_i32(r, "tensor dims")?);
                }
                let dtype = decode_dtype(read_i32(r, "tensor dtype")?)?;
                Self { name, dims, dtype }
            }
            RecordLayout::DimsFirst => {
                let n_dims = check_n_dims(i32::from_le_bytes(first) as i64)?;
                let name_len = read_i32(r, "tensor name_len")?;
                let name_len = usize::try_from(name_len).map_err(|_| {
                    FormatError::invalid(format!("negative tensor name length {name_len}"))
                })?;
                let raw_dtype = read_i32(r, "tensor dtype")?;
                let mut dims = Vec::with_capacity(n_dims);
                for _ in 0..n_dims {
                    dims.push(read_i32(r, "tensor dims")?);
                }
                let name = read_bytes(r, name_len, "tensor name")?;
                Self { name, dims, dtype: decode_dtype(raw_dtype)? }
            }
        };
        Ok(Some(header))
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W, layout: RecordLayout) -> Result<()> {
        match layout {
            RecordLayout::NameFirst => {
                write_u32(w, self.name.len() as u32)?;
                w.write_all(&self.name)?;
                write_u32(w, self.dims.len() as u32)?;
                for &d in &self.dims {
                    write_i32(w, d)?;
                }
                write_i32(w, self.dtype.id())?;
            }
            RecordLayout::DimsFirst => {
                write_i32(w, self.dims.len() as i32)?;
                write_i32(w, self.name.len() as i32)?;
                write_i32(w, self.dtype.id())?;
                for &d in &self.dims {
                    write_i32(w, d)?;
                }
                w.write_all(&self.name)?;
            }
        }
        Ok(())
    }

    /// Encoded header size in bytes (same for both layouts).
    pub fn encoded_len(&self) -> usize {
        4 + self.name.len() + 4 + 4 * self.dims.len() + 4
    }
}
