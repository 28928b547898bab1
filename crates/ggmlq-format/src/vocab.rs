//! Vocabulary section: count-prefixed, length-prefixed token strings.

use crate::error::Result;
use crate::io::{read_bytes, read_u32, write_u32};
use std::collections::HashMap;
use std::io::{Read, Write};

/// Bidirectional token table built while the vocabulary streams through.
///
/// Tokens are raw bytes; the format does not promise UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    token_to_id: HashMap<Vec<u8>, u32>,
    id_to_token: Vec<Vec<u8>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `token` with the next index. A repeated token keeps its slot in
    /// the id table but re-points the reverse lookup at the newest index.
    pub fn push(&mut self, token: Vec<u8>) -> u32 {
        let id = self.id_to_token.len() as u32;
        if let Some(prev) = self.token_to_id.insert(token.clone(), id) {
            let token = String::from_utf8_lossy(&token);
            tracing::warn!(prev, id, token = %token, "duplicate vocab token");
        }
        self.id_to_token.push(token);
        id
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    pub fn token_id(&self, token: &[u8]) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&[u8]> {
        self.id_to_token.get(id as usize).map(Vec::as_slice)
    }

    /// Iterate `(id, token)` in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.id_to_token.iter().enumerate().map(|(i, t)| (i as u32, t.as_slice()))
    }

    fn read_entry<R: Read + ?Sized>(r: &mut R) -> Result<Vec<u8>> {
        let len = read_u32(r, "vocab.len")? as usize;
        read_bytes(r, len, "vocab.token")
    }

    fn write_entry<W: Write + ?Sized>(w: &mut W, token: &[u8]) -> Result<()> {
        write_u32(w, token.len() as u32)?;
        w.write_all(token)?;
        Ok(())
    }

    /// Decode `n_vocab` entries without writing anything.
    ///
    /// A negative count is treated as zero.
    pub fn read<R: Read + ?Sized>(r: &mut R, n_vocab: i32) -> Result<Self> {
        let mut vocab = Self::new();
        for _ in 0..n_vocab.max(0) {
            vocab.push(Self::read_entry(r)?);
        }
        Ok(vocab)
    }

    /// Copy `n_vocab` entries from `r` to `w` unchanged, collecting them.
    pub fn transcode<R: Read + ?Sized, W: Write + ?Sized>(
        r: &mut R,
        w: &mut W,
        n_vocab: i32,
    ) -> Result<Self> {
        let mut vocab = Self::new();
        for _ in 0..n_vocab.max(0) {
            let token = Self::read_entry(r)?;
            Self::write_entry(w, &token)?;
            vocab.push(token);
        }
        tracing::debug!(entries = vocab.len(), "vocabulary copied");
        Ok(vocab)
    }

    /// Write the whole table in wire form (count not included).
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        for token in &self.id_to_token {
            Self::write_entry(w, token)?;
        }
        Ok(())
    }

    /// Encoded size of the section in bytes.
    pub fn encoded_len(&self) -> usize {
        self.id_to_token.iter().map(|t| 4 + t.len()).sum()
    }
}

impl<T: Into<Vec<u8>>> FromIterator<T> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vocab = Self::new();
        for token in iter {
            vocab.push(token.into());
        }
        vocab
    }
}
