//! Sliding-window chunker
//!
//! Splits document text into overlapping fixed-size windows. A window of
//! `chunk_size` chars advances by `chunk_size - overlap` chars; the final
//! window is truncated to the remaining text. Offsets count Unicode scalar
//! values so any input text round-trips safely.
//!
//! Reconstruction invariant: keeping the first chunk whole and dropping the
//! first `overlap` chars of every later chunk concatenates back to the
//! original text.

use ragent_core::{Chunk, Document, RagentError, Result};

/// Splits text into overlapping windows of a fixed char length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker, validating `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagentError::InvalidParameter(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(RagentError::InvalidParameter(format!(
                "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from retrieval config values
    pub fn from_config(config: &ragent_core::RetrievalConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Window size in chars
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive windows in chars
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Lazily iterate the windows of `text`.
    ///
    /// The iterator is finite and restartable: calling `windows` again (or
    /// cloning the iterator before use) replays the same sequence.
    pub fn windows<'a>(&self, text: &'a str) -> Windows<'a> {
        Windows {
            text,
            byte_pos: 0,
            char_pos: 0,
            chunk_size: self.chunk_size,
            stride: self.chunk_size - self.overlap,
            done: text.is_empty(),
        }
    }

    /// Split a document into chunks carrying ids, indices, and char offsets.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.windows(&document.text)
            .enumerate()
            .map(|(i, span)| {
                Chunk::new(document.id, i as u32, span.text, span.start, span.end)
            })
            .collect()
    }
}

/// A window over the source text with char offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan<'a> {
    /// Window text
    pub text: &'a str,

    /// Starting char offset (inclusive)
    pub start: usize,

    /// Ending char offset (exclusive)
    pub end: usize,
}

/// Lazy iterator over chunk windows. See [`Chunker::windows`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    text: &'a str,
    byte_pos: usize,
    char_pos: usize,
    chunk_size: usize,
    stride: usize,
    done: bool,
}

impl<'a> Iterator for Windows<'a> {
    type Item = ChunkSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.text[self.byte_pos..];

        // Walk at most chunk_size chars, recording the byte length of the
        // window and of the stride prefix.
        let mut taken = 0usize;
        let mut window_bytes = rest.len();
        let mut stride_bytes = rest.len();
        for (byte_idx, _) in rest.char_indices() {
            if taken == self.stride {
                stride_bytes = byte_idx;
            }
            if taken == self.chunk_size {
                window_bytes = byte_idx;
                break;
            }
            taken += 1;
        }
        let window_chars = taken.min(self.chunk_size);

        let span = ChunkSpan {
            text: &rest[..window_bytes],
            start: self.char_pos,
            end: self.char_pos + window_chars,
        };

        if window_bytes == rest.len() {
            // The window reached the end of the text. This covers both a
            // truncated tail and a full window landing exactly on the end;
            // advancing past the latter would emit a residue of pure overlap.
            self.done = true;
        } else {
            self.byte_pos += stride_bytes;
            self.char_pos += self.stride;
        }

        Some(span)
    }
}
