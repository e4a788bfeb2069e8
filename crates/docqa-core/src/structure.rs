//! Font-size document structurer.
//!
//! Turns reader output ([`Page`]s of [`Line`]s of [`Span`]s) into an
//! ordered list of heading-delimited [`Section`]s.
//!
//! # Algorithm
//!
//! 1. Build a histogram of every span's font size, rounded half-to-even.
//! 2. The most frequent size is the body-text baseline. Ties go to the
//!    size seen first in reading order.
//! 3. Walk the lines in order. A line whose leading span is strictly
//!    larger than the baseline closes the current section and opens a
//!    new one with that line as its heading. Any other line is appended
//!    to the current body, space-joined.
//! 4. Close the final section after the last page.
//!
//! Sections whose trimmed body is empty are dropped, so a trailing
//! heading with nothing under it contributes nothing. A document with no
//! spans produces no sections.
//!
//! [`Line`]: crate::models::Line
//! [`Span`]: crate::models::Span

use std::collections::HashMap;

use anyhow::Result;

use crate::models::{Page, Section};

/// Source of extracted pages for one document.
///
/// Readers are consumed by ingestion, so a reader that owns a temporary
/// file releases it as soon as its pages have been produced.
pub trait DocumentReader: Send {
    fn read_pages(self) -> Result<Vec<Page>>;
}

/// Pre-extracted pages read as-is.
impl DocumentReader for Vec<Page> {
    fn read_pages(self) -> Result<Vec<Page>> {
        Ok(self)
    }
}

/// Round a font size the way the histogram keys it.
pub fn rounded_size(size: f32) -> i32 {
    size.round_ties_even() as i32
}

/// The body-text baseline: the most frequent rounded span size.
///
/// Returns `None` when the pages contain no spans.
pub fn body_size(pages: &[Page]) -> Option<i32> {
    // size -> (count, first seen position)
    let mut histogram: HashMap<i32, (usize, usize)> = HashMap::new();
    let mut position = 0usize;

    for span in pages
        .iter()
        .flat_map(|p| p.lines.iter())
        .flat_map(|l| l.spans.iter())
    {
        let entry = histogram.entry(rounded_size(span.size)).or_insert((0, position));
        entry.0 += 1;
        position += 1;
    }

    histogram
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(size, _)| size)
}

/// Section under construction.
#[derive(Default)]
struct Pending {
    page_number: Option<u32>,
    heading: String,
    body: String,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.heading.is_empty() && self.body.is_empty()
    }

    fn flush_into(self, sections: &mut Vec<Section>) {
        let body = self.body.trim();
        if body.is_empty() {
            return;
        }
        sections.push(Section {
            page_number: self.page_number.unwrap_or(1),
            heading: self.heading,
            body: body.to_string(),
        });
    }
}

/// Segment pages into heading-delimited sections.
pub fn structure(pages: &[Page]) -> Vec<Section> {
    let baseline = match body_size(pages) {
        Some(size) => size,
        None => return Vec::new(),
    };

    let mut sections = Vec::new();
    let mut current = Pending::default();

    for page in pages {
        for line in &page.lines {
            let leading = match line.spans.first() {
                Some(span) => span,
                None => continue,
            };
            let text = line.text();

            // A heading-sized line ends the section even when blank; the
            // next section then starts without a heading.
            if rounded_size(leading.size) > baseline {
                let finished = std::mem::take(&mut current);
                if !finished.is_empty() {
                    finished.flush_into(&mut sections);
                }
                current.page_number = Some(page.number);
                current.heading = text;
            } else if !text.is_empty() {
                if current.page_number.is_none() {
                    current.page_number = Some(page.number);
                }
                current.body.push(' ');
                current.body.push_str(&text);
            }
        }
    }

    if !current.is_empty() {
        current.flush_into(&mut sections);
    }

    sections
}
