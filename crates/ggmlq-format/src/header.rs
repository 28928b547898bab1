//! Stream header: magic tag and optional format version.

use crate::error::{FormatError, Result};
use crate::io::{read_u32, write_u32};
use serde::Serialize;
use std::io::{Read, Write};

/// `"ggml"` read as a little-endian u32. No version field follows.
pub const GGML_MAGIC: u32 = 0x6767_6d6c;
/// `"ggmf"` read as a little-endian u32. A u32 version field follows.
pub const GGMF_MAGIC: u32 = 0x6767_6d66;

/// Recognized container magics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Magic {
    /// `ggml`: unversioned.
    Ggml,
    /// `ggmf`: versioned.
    Ggmf,
}

impl Magic {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            GGML_MAGIC => Some(Self::Ggml),
            GGMF_MAGIC => Some(Self::Ggmf),
            _ => None,
        }
    }

    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Ggml => GGML_MAGIC,
            Self::Ggmf => GGMF_MAGIC,
        }
    }

    pub const fn is_versioned(self) -> bool {
        matches!(self, Self::Ggmf)
    }
}

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamHeader {
    pub magic: Magic,
    /// Present iff `magic` is [`Magic::Ggmf`].
    pub version: Option<u32>,
}

impl StreamHeader {
    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let raw = read_u32(r, "magic")?;
        let magic = Magic::from_u32(raw).ok_or_else(|| {
            FormatError::invalid(format!("bad magic 0x{raw:08x} (expected 'ggml' or 'ggmf')"))
        })?;
        let version = if magic.is_versioned() { Some(read_u32(r, "version")?) } else { None };
        Ok(Self { magic, version })
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.magic.as_u32())?;
        if let Some(version) = self.version {
            write_u32(w, version)?;
        }
        Ok(())
    }

    /// Read the header and write it back unchanged.
    ///
    /// The whole header is validated before the first output byte, so a bad
    /// magic leaves the output untouched.
    pub fn transcode<R: Read + ?Sized, W: Write + ?Sized>(r: &mut R, w: &mut W) -> Result<Self> {
        let header = Self::read(r)?;
        header.write(w)?;
        tracing::debug!(magic = ?header.magic, version = ?header.version, "stream header");
        Ok(header)
    }

    /// Encoded size in bytes.
    pub const fn encoded_len(&self) -> usize {
        if self.version.is_some() { 8 } else { 4 }
    }
}
