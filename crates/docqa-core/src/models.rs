//! Core data models used throughout docqa.
//!
//! Pages, lines, and spans are the raw reader output. Sections and chunks
//! exist only while one document is being ingested; indexed chunks belong
//! to the vector index until it is wiped.

use serde::{Deserialize, Serialize};

/// A run of text rendered at a single font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    /// Font size in points, as reported by the reader.
    pub size: f32,
}

impl Span {
    pub fn new(text: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            size,
        }
    }
}

/// One visual line of a page, made of one or more spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    /// Convenience constructor for a line rendered in a single size.
    pub fn single(text: impl Into<String>, size: f32) -> Self {
        Self {
            spans: vec![Span::new(text, size)],
        }
    }

    /// Concatenated span text, trimmed.
    pub fn text(&self) -> String {
        let joined: String = self.spans.iter().map(|s| s.text.as_str()).collect();
        joined.trim().to_string()
    }
}

/// A page of extracted text, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub lines: Vec<Line>,
}

impl Page {
    pub fn new(number: u32, lines: Vec<Line>) -> Self {
        Self { number, lines }
    }
}

/// A heading-delimited span of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// 1-based page the section starts on.
    pub page_number: u32,
    /// Heading text; empty for body text that precedes the first heading.
    pub heading: String,
    pub body: String,
}

/// A bounded piece of a section body, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub page_number: u32,
    pub content: String,
}

/// Metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub page_number: u32,
}

/// A chunk owned by the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    /// Generated at add time, never reused.
    pub chunk_id: String,
    pub doc_id: String,
    pub page_number: u32,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: self.doc_id.clone(),
            page_number: self.page_number,
        }
    }
}
