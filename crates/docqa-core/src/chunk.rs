//! Overlap-aware recursive text chunker.
//!
//! Splits each [`Section`] body into [`Chunk`]s of at most `chunk_size`
//! characters, with consecutive chunks of the same section sharing up to
//! `overlap` characters. A chunk never spans two sections and always
//! carries its section's page number.
//!
//! # Algorithm
//!
//! 1. Pick the first separator (paragraph `\n\n`, line `\n`, sentence
//!    `. `, word ` `) that occurs in the text; fall back to single
//!    characters when none does.
//! 2. Split on it, keeping the separator at the end of each piece.
//! 3. Pieces shorter than `chunk_size` are merged greedily into chunks.
//!    When the next piece would overflow, the chunk is emitted and pieces
//!    are dropped from its front until at most `overlap` characters
//!    remain; those carry over into the next chunk.
//! 4. Pieces that are too long are split again with the next separator.
//!
//! Lengths are counted in `char`s, so multi-byte text never splits inside
//! a code point.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::split_sections;
//! use docqa_core::models::Section;
//!
//! let sections = vec![Section {
//!     page_number: 4,
//!     heading: "Intro".to_string(),
//!     body: "Hello world.".to_string(),
//! }];
//! let chunks = split_sections(&sections, 2000, 300).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].page_number, 4);
//! ```

use std::collections::VecDeque;

use anyhow::{ensure, Result};

use crate::models::{Chunk, Section};

/// Separators tried in order, coarsest first. The empty separator means
/// "split into characters".
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Recursive boundary-seeking splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<&'static str>,
}

impl RecursiveSplitter {
    /// Create a splitter. Requires `chunk_size > overlap`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ensure!(
            chunk_size > overlap,
            "chunk_size ({}) must be greater than overlap ({})",
            chunk_size,
            overlap
        );
        Ok(Self {
            chunk_size,
            overlap,
            separators: DEFAULT_SEPARATORS.to_vec(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split one text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split_inclusive(separator).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying `overlap` forward.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > self.overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split every section body independently, preserving page provenance.
///
/// Output order is section order, then split order within a section.
pub fn split_sections(
    sections: &[Section],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let splitter = RecursiveSplitter::new(chunk_size, overlap)?;
    Ok(sections
        .iter()
        .flat_map(|section| {
            splitter
                .split_text(&section.body)
                .into_iter()
                .map(move |content| Chunk {
                    page_number: section.page_number,
                    content,
                })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(page: u32, body: &str) -> Section {
        Section {
            page_number: page,
            heading: String::new(),
            body: body.to_string(),
        }
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_short_body_single_chunk() {
        let chunks = split_sections(&[section(2, "Hello world")], 2000, 300).unwrap();
        assert_eq!(
            chunks,
            vec![Chunk {
                page_number: 2,
                content: "Hello world".to_string()
            }]
        );
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(RecursiveSplitter::new(100, 100).is_err());
        assert!(RecursiveSplitter::new(10, 20).is_err());
        assert!(RecursiveSplitter::new(10, 0).is_ok());
    }

    #[test]
    fn test_chunks_respect_budget() {
        let body = words(500);
        let splitter = RecursiveSplitter::new(60, 15).unwrap();
        let chunks = splitter.split_text(&body);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 60, "chunk too long: {:?}", c);
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let body = words(200);
        let splitter = RecursiveSplitter::new(50, 10).unwrap();
        let chunks = splitter.split_text(&body);
        for pair in chunks.windows(2) {
            let first_next = pair[1].split_whitespace().next().unwrap();
            assert!(
                pair[0].split_whitespace().any(|w| w == first_next),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_zero_overlap_does_not_repeat_words() {
        let body = words(100);
        let splitter = RecursiveSplitter::new(40, 0).unwrap();
        let chunks = splitter.split_text(&body);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(rejoined, body.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let body = "Alpha paragraph text.\n\nBeta paragraph text.";
        let splitter = RecursiveSplitter::new(30, 0).unwrap();
        let chunks = splitter.split_text(body);
        assert_eq!(chunks, vec!["Alpha paragraph text.", "Beta paragraph text."]);
    }

    #[test]
    fn test_sentence_boundary_keeps_punctuation() {
        let body = "First sentence here. Second sentence here. Third one.";
        let splitter = RecursiveSplitter::new(25, 0).unwrap();
        let chunks = splitter.split_text(body);
        assert_eq!(chunks[0], "First sentence here.");
        assert_eq!(chunks[1], "Second sentence here.");
    }

    #[test]
    fn test_hard_cut_for_unbroken_text() {
        let body = "x".repeat(95);
        let splitter = RecursiveSplitter::new(20, 5).unwrap();
        let chunks = splitter.split_text(&body);
        assert!(chunks.len() >= 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_multibyte_text_is_safe() {
        let body = "┌──────────────────┐ │ Hello wörld │ └──────────────────┘".repeat(5);
        let splitter = RecursiveSplitter::new(12, 3).unwrap();
        let chunks = splitter.split_text(&body);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_chunks_inherit_section_pages_in_order() {
        let sections = vec![section(1, &words(60)), section(2, "short"), section(5, &words(60))];
        let chunks = split_sections(&sections, 40, 8).unwrap();

        let pages: Vec<u32> = chunks.iter().map(|c| c.page_number).collect();
        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted);
        assert!(pages.contains(&1) && pages.contains(&2) && pages.contains(&5));
        assert!(chunks.iter().any(|c| c.page_number == 2 && c.content == "short"));
    }

    #[test]
    fn test_no_chunk_crosses_sections() {
        let sections = vec![section(1, "aaa bbb"), section(2, "ccc ddd")];
        let chunks = split_sections(&sections, 100, 10).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "aaa bbb");
        assert_eq!(chunks[1].content, "ccc ddd");
    }
}
