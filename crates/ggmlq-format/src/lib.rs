//! Wire format of legacy GGML model checkpoints.
//!
//! A checkpoint is a single little-endian stream:
//!
//! ```text
//! magic:u32 [version:u32 if 'ggmf']
//! hparams: 8 x i32
//! vocab:   (len:u32 bytes[len]) x n_vocab
//! tensor record*  (header + payload, until end of stream)
//! ```
//!
//! Every section exposes `read`, `write` and a `transcode` that streams the
//! section from a reader to a writer. Nothing here buffers more than one
//! section (or one tensor header) at a time.
//!
//! # Example
//!
//! ```
//! use ggmlq_format::{Hparams, QuantizationType, StreamHeader, Vocabulary};
//! use std::io::Cursor;
//!
//! let mut input = Vec::new();
//! input.extend_from_slice(&ggmlq_format::GGML_MAGIC.to_le_bytes());
//! Hparams { n_vocab: 1, ..Default::default() }.write(&mut input).unwrap();
//! input.extend_from_slice(&2u32.to_le_bytes());
//! input.extend_from_slice(b"hi");
//!
//! let mut r = Cursor::new(input);
//! let mut out = Vec::new();
//! StreamHeader::transcode(&mut r, &mut out).unwrap();
//! let hp = Hparams::transcode(&mut r, &mut out, QuantizationType::Q4_0).unwrap();
//! let vocab = Vocabulary::transcode(&mut r, &mut out, hp.n_vocab).unwrap();
//! assert_eq!(vocab.token_id(b"hi"), Some(0));
//! ```

pub mod error;
pub mod header;
pub mod hparams;
pub mod io;
pub mod tensor;
pub mod types;
pub mod vocab;

pub use error::{FormatError, Result};
pub use header::{GGMF_MAGIC, GGML_MAGIC, Magic, StreamHeader};
pub use hparams::{HPARAMS_FIELDS, Hparams};
pub use tensor::{MAX_DIMS, RecordLayout, TensorHeader};
pub use types::{GgmlType, QuantizationType, UnknownQuantizationType};
pub use vocab::Vocabulary;
