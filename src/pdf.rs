//! PDF page reader.
//!
//! Walks each page's content stream with lopdf and emits [`Page`]s of
//! [`Line`]s of [`Span`]s, keeping the font size each run was shown at.
//! That size is all the structurer needs to find headings.
//!
//! | Operator | Effect |
//! |----------|--------|
//! | `Tf` | set current font size |
//! | `Tm` | set the text matrix scale, break the line |
//! | `Tj`, `TJ` | append a span at the current size |
//! | `'`, `"` | break the line, then append a span |
//! | `Td`, `TD`, `T*`, `BT`, `ET` | break the line |
//!
//! A span's size is the `Tf` size times the text matrix's vertical scale,
//! so `/F1 1 Tf 18 0 0 18 x y Tm` reads as 18pt.
//!
//! Text is decoded as UTF-16 (with or without BOM), UTF-8, or
//! PDFDocEncoding/Latin-1. Glyph-id fonts without a usable encoding come
//! out garbled; such documents are out of scope.

use anyhow::{Context, Result};
use lopdf::{Document, Object};
use std::path::{Path, PathBuf};

use docqa_core::models::{Line, Page, Span};
use docqa_core::structure::DocumentReader;

use crate::staging::StagedUpload;

/// Font size assumed before the first `Tf`.
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// `TJ` adjustments at or below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

enum Source {
    Path(PathBuf),
    Staged(StagedUpload),
    Bytes(Vec<u8>),
}

/// [`DocumentReader`] over a PDF file, staged upload, or in-memory bytes.
pub struct PdfReader {
    source: Source,
}

impl PdfReader {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Path(path.into()),
        }
    }

    /// Read a staged upload; the staged file is removed once reading ends.
    pub fn from_staged(upload: StagedUpload) -> Self {
        Self {
            source: Source::Staged(upload),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: Source::Bytes(bytes),
        }
    }

    fn load(&self) -> Result<Document> {
        match &self.source {
            Source::Path(path) => load_path(path),
            Source::Staged(upload) => load_path(upload.path()),
            Source::Bytes(bytes) => Document::load_mem(bytes).context("Failed to parse PDF"),
        }
    }
}

fn load_path(path: &Path) -> Result<Document> {
    Document::load(path).with_context(|| format!("Failed to load PDF: {}", path.display()))
}

impl DocumentReader for PdfReader {
    fn read_pages(self) -> Result<Vec<Page>> {
        let doc = self.load()?;
        let mut pages = Vec::new();
        for (number, page_id) in doc.get_pages() {
            let content = doc
                .get_page_content(page_id)
                .with_context(|| format!("Failed to read content of page {}", number))?;
            let operations = lopdf::content::Content::decode(&content)
                .with_context(|| format!("Failed to decode content stream of page {}", number))?
                .operations;
            pages.push(Page::new(number, lines_from_operations(&operations)));
        }
        tracing::debug!(pages = pages.len(), "read PDF");
        Ok(pages)
    }
}

// ============ Content stream walk ============

#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line>,
    current: Vec<Span>,
}

impl LineBuilder {
    fn push(&mut self, text: String, size: f32) {
        if text.is_empty() {
            return;
        }
        match self.current.last_mut() {
            Some(last) if last.size == size => last.text.push_str(&text),
            _ => self.current.push(Span::new(text, size)),
        }
    }

    fn break_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        if spans.iter().any(|s| !s.text.trim().is_empty()) {
            self.lines.push(Line::new(spans));
        }
    }

    fn finish(mut self) -> Vec<Line> {
        self.break_line();
        self.lines
    }
}

fn lines_from_operations(operations: &[lopdf::content::Operation]) -> Vec<Line> {
    let mut builder = LineBuilder::default();
    let mut font_size = DEFAULT_FONT_SIZE;
    let mut scale = 1.0_f32;

    for op in operations {
        let size = font_size * scale;
        match op.operator.as_str() {
            "Tf" => {
                if let Some(s) = op.operands.get(1).and_then(number) {
                    font_size = s.abs();
                }
            }
            "Tm" => {
                builder.break_line();
                if let Some(s) = vertical_scale(&op.operands) {
                    scale = s;
                }
            }
            "BT" => {
                builder.break_line();
                scale = 1.0;
            }
            "Tj" => {
                if let Some(text) = op.operands.first().and_then(string_operand) {
                    builder.push(text, size);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    let mut text = String::new();
                    for item in items {
                        if let Some(s) = string_operand(item) {
                            text.push_str(&s);
                        } else if number(item).is_some_and(|n| n <= TJ_SPACE_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                    builder.push(text, size);
                }
            }
            "'" | "\"" => {
                builder.break_line();
                if let Some(text) = op.operands.last().and_then(string_operand) {
                    builder.push(text, size);
                }
            }
            "Td" | "TD" | "T*" | "ET" => builder.break_line(),
            _ => {}
        }
    }

    builder.finish()
}

/// Length of the matrix's `(b, d)` column; `None` for a malformed or
/// degenerate matrix.
fn vertical_scale(operands: &[Object]) -> Option<f32> {
    let b = operands.get(1).and_then(number)?;
    let d = operands.get(3).and_then(number)?;
    let scale = (b * b + d * d).sqrt();
    (scale > 0.0).then_some(scale)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn string_operand(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => decode_pdf_bytes_to_string(bytes),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE/LE, UTF-8, else Latin-1.
/// Control characters are dropped; `None` when nothing printable remains.
pub fn decode_pdf_bytes_to_string(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        return decode_utf16(&bytes[2..], u16::from_be_bytes);
    }

    if bytes.len() >= 4 {
        let pairs = || bytes.chunks(2).take(4);
        if pairs().all(|c| c.len() == 2 && c[1] == 0 && c[0] < 128) {
            if let Some(s) = decode_utf16(bytes, u16::from_le_bytes) {
                return Some(s);
            }
        }
        if pairs().all(|c| c.len() == 2 && c[0] == 0 && c[1] < 128) {
            if let Some(s) = decode_utf16(bytes, u16::from_be_bytes) {
                return Some(s);
            }
        }
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        if let Some(cleaned) = printable(s.chars()) {
            return Some(cleaned);
        }
    }

    printable(bytes.iter().map(|&b| b as char))
}

fn decode_utf16(bytes: &[u8], word: fn([u8; 2]) -> u16) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| word([c[0], c[1]]))
        .collect();
    String::from_utf16(&units)
        .ok()
        .and_then(|s| printable(s.chars()))
}

fn printable(chars: impl Iterator<Item = char>) -> Option<String> {
    let s: String = chars.filter(|c| !c.is_control()).collect();
    (!s.is_empty()).then_some(s)
}
