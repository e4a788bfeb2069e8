//! Citations and retrieval results.
//!
//! A [`CitationSet`] is always deduplicated on `(doc_id, page)` and
//! iterates in lexicographic `(doc_id, page)` order, so rendering never
//! has to sort or dedup again. Citations are only ever built from index
//! metadata, never from generated text.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::models::ChunkMetadata;

/// Canonical answer text when retrieval finds nothing usable.
pub const NOT_FOUND_ANSWER: &str = "No relevant information found in the documents.";

/// Prefix of every answer backed by retrieved chunks.
pub const FOUND_PREFIX: &str = "Based on the documents:";

/// A `(document, page)` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Citation {
    pub doc_id: String,
    pub page: u32,
}

impl From<&ChunkMetadata> for Citation {
    fn from(meta: &ChunkMetadata) -> Self {
        Citation {
            doc_id: meta.doc_id.clone(),
            page: meta.page_number,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document {}, Page {}", self.doc_id, self.page)
    }
}

/// Sorted, deduplicated citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationSet(BTreeSet<Citation>);

impl CitationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, citation: Citation) -> bool {
        self.0.insert(citation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Citation> {
        self.0.iter()
    }

    pub fn contains(&self, doc_id: &str, page: u32) -> bool {
        self.0.iter().any(|c| c.doc_id == doc_id && c.page == page)
    }

    /// One `- Document <id>, Page <n>` line per citation.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> FromIterator<&'a ChunkMetadata> for CitationSet {
    fn from_iter<I: IntoIterator<Item = &'a ChunkMetadata>>(iter: I) -> Self {
        CitationSet(iter.into_iter().map(Citation::from).collect())
    }
}

impl FromIterator<Citation> for CitationSet {
    fn from_iter<I: IntoIterator<Item = Citation>>(iter: I) -> Self {
        CitationSet(iter.into_iter().collect())
    }
}

/// Outcome of one retrieval-and-synthesis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalResult {
    Found {
        answer: String,
        citations: CitationSet,
    },
    NotFound,
}

impl RetrievalResult {
    pub fn is_found(&self) -> bool {
        matches!(self, RetrievalResult::Found { .. })
    }

    pub fn citations(&self) -> Option<&CitationSet> {
        match self {
            RetrievalResult::Found { citations, .. } => Some(citations),
            RetrievalResult::NotFound => None,
        }
    }
}

/// Render a found answer in the canonical `Based on the documents:` shape.
pub fn render_found(answer: &str, citations: &CitationSet) -> String {
    format!("{} {}\nSources:\n{}", FOUND_PREFIX, answer.trim(), citations.render())
}

impl fmt::Display for RetrievalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalResult::Found { answer, citations } => {
                f.write_str(&render_found(answer, citations))
            }
            RetrievalResult::NotFound => f.write_str(NOT_FOUND_ANSWER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(doc: &str, page: u32) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: doc.to_string(),
            page_number: page,
        }
    }

    #[test]
    fn test_citations_dedup_and_sort() {
        let metas = [meta("b", 2), meta("a", 10), meta("b", 2), meta("a", 9)];
        let set: CitationSet = metas.iter().collect();
        assert_eq!(set.len(), 3);
        assert_eq!(
            set.render(),
            "- Document a, Page 9\n- Document a, Page 10\n- Document b, Page 2"
        );
    }

    #[test]
    fn test_found_rendering() {
        let set: CitationSet = [meta("doc-1", 1)].iter().collect();
        let result = RetrievalResult::Found {
            answer: "  The sky is blue. ".to_string(),
            citations: set,
        };
        assert_eq!(
            result.to_string(),
            "Based on the documents: The sky is blue.\nSources:\n- Document doc-1, Page 1"
        );
    }

    #[test]
    fn test_not_found_rendering() {
        assert_eq!(RetrievalResult::NotFound.to_string(), NOT_FOUND_ANSWER);
        assert!(RetrievalResult::NotFound.citations().is_none());
    }
}
