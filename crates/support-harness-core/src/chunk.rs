//! Overlapping sliding-window text chunker.
//!
//! Splits normalized source text into [`Chunk`]s of at most `chunk_size`
//! characters, each starting `overlap` characters before the end of the
//! previous one so that sentences cut at a boundary remain retrievable.
//!
//! Each chunk receives a random UUID, its index within the source, a
//! SHA-256 hash of its text, and a copy of the source metadata.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look for the last natural break inside the window, trying
//!    paragraph (`\n\n`), line (`\n`), sentence (`. `, `? `, `! `) and word
//!    (` `) separators in that order. A break is only accepted in the second
//!    half of the window and past the overlap, so every window advances.
//! 3. With no acceptable break, hard-cut at `chunk_size`.
//! 4. The next window starts `overlap` characters before the cut, snapped
//!    forward to the next word start when one lies in the overlap region.
//! 5. Chunks are whitespace-trimmed; blank chunks are dropped.
//!
//! Lengths are measured in `char`s, never bytes, so multi-byte text is never
//! split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use support_harness_core::chunk::Chunker;
//! use support_harness_core::models::ChunkMetadata;
//!
//! let chunker = Chunker::new(500, 100).unwrap();
//! let chunks = chunker.chunk("Check-in starts at 2pm.", &ChunkMetadata::website());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! assert_eq!(chunks[0].metadata.source, "website");
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Chunk, ChunkMetadata};

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Natural break separators, strongest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "? ", "! ", " "];

/// Invalid chunker configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk_size must be > 0")]
    ZeroSize,
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Sliding-window chunker with a fixed size and overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    /// Create a chunker. `overlap` must be strictly less than `size`,
    /// otherwise the window could never advance.
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks tagged with `metadata`.
    ///
    /// Returns chunks with contiguous indices starting at 0. Blank input
    /// yields an empty vector.
    pub fn chunk(&self, text: &str, metadata: &ChunkMetadata) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(i, piece)| make_chunk(i as i64, piece, metadata))
            .collect()
    }

    /// Split `text` into trimmed, non-blank pieces of at most `size` chars.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut pieces = Vec::new();
        let mut start = 0usize;

        while start < total {
            if total - start <= self.size {
                push_piece(&mut pieces, &chars[start..total]);
                break;
            }

            let end = self.find_break(&chars, start);
            push_piece(&mut pieces, &chars[start..end]);
            start = self.next_start(&chars, end);
        }

        pieces
    }

    /// Pick the end of the window starting at `start`.
    fn find_break(&self, chars: &[char], start: usize) -> usize {
        let window_end = start + self.size;
        let min_end = (start + self.overlap + 1).max(start + self.size / 2);

        for sep in SEPARATORS {
            let sep: Vec<char> = sep.chars().collect();
            if let Some(pos) = rfind_within(chars, start, window_end, &sep) {
                let end = pos + sep.len();
                if end >= min_end {
                    return end;
                }
            }
        }

        window_end
    }

    /// Start of the next window, `overlap` chars back from `end`.
    fn next_start(&self, chars: &[char], end: usize) -> usize {
        if self.overlap == 0 {
            return end;
        }
        let from = end - self.overlap;
        if from == 0 || chars[from - 1].is_whitespace() {
            return from;
        }
        match (from..end).find(|&i| chars[i].is_whitespace()) {
            Some(i) if i + 1 < end => i + 1,
            _ => from,
        }
    }
}

/// Last position of `sep` lying entirely inside `chars[lo..hi]`.
fn rfind_within(chars: &[char], lo: usize, hi: usize, sep: &[char]) -> Option<usize> {
    if hi < lo + sep.len() {
        return None;
    }
    (lo..=hi - sep.len())
        .rev()
        .find(|&i| chars[i..i + sep.len()] == *sep)
}

fn push_piece(pieces: &mut Vec<String>, slice: &[char]) {
    let piece: String = slice.iter().collect();
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}

/// Create a single [`Chunk`] with a UUID and SHA-256 content hash.
fn make_chunk(index: i64, text: String, metadata: &ChunkMetadata) -> Chunk {
    let hash = hex::encode(Sha256::digest(text.as_bytes()));

    Chunk {
        id: Uuid::new_v4().to_string(),
        chunk_index: index,
        text,
        hash,
        metadata: metadata.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn unique_words(count: usize) -> String {
        (0..count).map(|i| format!("w{:04} ", i)).collect()
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert_eq!(
            Chunker::new(100, 100),
            Err(ChunkError::OverlapTooLarge {
                size: 100,
                overlap: 100
            })
        );
        assert_eq!(Chunker::new(0, 0), Err(ChunkError::ZeroSize));
        assert!(Chunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = Chunker::default().chunk("Hello, world!", &ChunkMetadata::website());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_blank_text_yields_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.chunk("", &ChunkMetadata::website()).is_empty());
        assert!(chunker.chunk("  \n\n  ", &ChunkMetadata::website()).is_empty());
    }

    #[test]
    fn test_1200_chars_gives_three_overlapping_chunks() {
        let text = unique_words(200);
        assert_eq!(text.chars().count(), 1200);

        let pieces = Chunker::new(500, 100).unwrap().split(&text);
        assert_eq!(pieces.len(), 3);

        for pair in pieces.windows(2) {
            let prev_start = text.find(&pair[0]).unwrap();
            let prev_end = prev_start + pair[0].len();
            let next_start = text.find(&pair[1]).unwrap();
            assert!(
                next_start >= prev_end - 100 && next_start < prev_end,
                "next chunk starts at {} but previous spans {}..{}",
                next_start,
                prev_start,
                prev_end
            );
        }
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let text = "x".repeat(1200);
        let pieces = Chunker::new(500, 100).unwrap().split(&text);
        let lens: Vec<usize> = pieces.iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![500, 500, 400]);
    }

    #[test]
    fn test_every_chunk_within_size() {
        let text = (0..300)
            .map(|i| format!("Sentence number {} about late checkout.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunker = Chunker::new(120, 30).unwrap();
        for piece in chunker.split(&text) {
            assert!(piece.chars().count() <= 120, "chunk too long: {}", piece);
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let first = "a".repeat(70);
        let second = "b".repeat(70);
        let text = format!("{}\n\n{}", first, second);
        let pieces = Chunker::new(100, 10).unwrap().split(&text);
        assert_eq!(pieces[0], first);
        assert!(pieces.last().unwrap().ends_with(&second));
    }

    #[test]
    fn test_zero_overlap_partitions_text() {
        let text = "y".repeat(250);
        let pieces = Chunker::new(100, 0).unwrap().split(&text);
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘".repeat(20);
        let chunks = Chunker::new(50, 10).unwrap().chunk(&text, &ChunkMetadata::new("doc.pdf"));
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.text.chars().count() <= 50);
            assert_eq!(c.metadata.source, "doc.pdf");
        }
    }

    #[test]
    fn test_indices_contiguous_and_hash_deterministic() {
        let text = unique_words(400);
        let chunker = Chunker::default();
        let c1 = chunker.chunk(&text, &ChunkMetadata::website());
        let c2 = chunker.chunk(&text, &ChunkMetadata::website());
        assert_eq!(c1.len(), c2.len());
        for (i, (a, b)) in c1.iter().zip(c2.iter()).enumerate() {
            assert_eq!(a.chunk_index, i as i64);
            assert_eq!(a.text, b.text);
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.hash, Fingerprint::of(&a.text).as_str());
            assert_ne!(a.id, b.id);
        }
    }
}
