//! Little-endian primitive readers and writers.
//!
//! Every reader distinguishes a short read (`TruncatedInput`) from other I/O
//! failures so callers can report exactly which field was cut off.

use crate::error::{FormatError, Result};
use std::io::{ErrorKind, Read, Write};

/// Fill `buf` completely, reporting how many bytes were actually available on
/// a short read.
fn fill<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `buf.len()` bytes or fail with `TruncatedInput`.
pub fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    let got = fill(r, buf)?;
    if got < buf.len() {
        return Err(FormatError::TruncatedInput { what, needed: buf.len(), got });
    }
    Ok(())
}

/// Read exactly `buf.len()` bytes, or return `Ok(false)` when the stream is
/// already exhausted. A partial read is still `TruncatedInput`.
pub fn read_exact_or_eof<R: Read + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<bool> {
    let got = fill(r, buf)?;
    match got {
        0 if !buf.is_empty() => Ok(false),
        n if n == buf.len() => Ok(true),
        n => Err(FormatError::TruncatedInput { what, needed: buf.len(), got: n }),
    }
}

/// Read `len` bytes into a fresh buffer.
///
/// The buffer grows with the data actually present, so a corrupt length
/// prefix cannot force a huge allocation before the short read is detected.
pub fn read_bytes<R: Read + ?Sized>(r: &mut R, len: usize, what: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(1 << 20));
    let got = Read::take(&mut *r, len as u64).read_to_end(&mut buf)?;
    if got < len {
        return Err(FormatError::TruncatedInput { what, needed: len, got });
    }
    Ok(buf)
}

#[inline]
pub fn read_u32<R: Read + ?Sized>(r: &mut R, what: &'static str) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b, what)?;
    Ok(u32::from_le_bytes(b))
}

#[inline]
pub fn read_i32<R: Read + ?Sized>(r: &mut R, what: &'static str) -> Result<i32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b, what)?;
    Ok(i32::from_le_bytes(b))
}

#[inline]
pub fn write_u32<W: Write + ?Sized>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

#[inline]
pub fn write_i32<W: Write + ?Sized>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}
