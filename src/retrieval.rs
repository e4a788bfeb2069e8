//! Retrieval synthesizer: embed the query, pull the nearest chunks, and
//! have the generator answer from them.
//!
//! ```text
//! query ──▶ embed ──▶ VectorIndex::query ──▶ [Page N] context ──▶ generate
//!                              │                                     │
//!                              ▼                                     ▼
//!                     no hits: NotFound          "no relevant information": NotFound
//!                                                 otherwise: Found + citations
//! ```
//!
//! Citations come from the metadata of the chunks placed in the context,
//! never from the generated text.

use anyhow::{Context, Result};

use docqa_core::citation::{CitationSet, RetrievalResult, FOUND_PREFIX};
use docqa_core::index::{IndexHit, VectorIndex};

use crate::embedding::Embedder;
use crate::generation::{GenerationRequest, Generator};
use crate::prompt::PromptTemplate;

/// Question used when the caller supplied only a document filter.
pub const SUMMARY_QUESTION: &str = "Summarize the document.";

const SYNTHESIS_TEMPLATE: &str = "\
You are a precise and thorough assistant. Answer using ONLY the context below.

Context:
{context}

Question: {question}

Instructions:
1. Give a clear, complete answer based only on the context.
2. If the context does not contain the answer, reply exactly:
   No relevant information found in the documents.
3. Otherwise reply with the answer text only. Do not list sources; they are added for you.

Sources available for this context:
{sources}

Answer:";

pub struct Synthesizer<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
    max_context_chars: usize,
    template: PromptTemplate,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        generator: &'a dyn Generator,
        max_context_chars: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            max_context_chars,
            template: PromptTemplate::new(SYNTHESIS_TEMPLATE),
        }
    }

    pub async fn answer(
        &self,
        query: &str,
        doc_ids: Option<&[String]>,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let query = query.trim();
        // Embedding providers reject empty input.
        let embed_input = if query.is_empty() { " " } else { query };

        let query_embedding = self
            .embedder
            .embed(embed_input)
            .await
            .context("Failed to embed query")?;
        let hits = self
            .index
            .query(&query_embedding, doc_ids, top_k)
            .await
            .context("Vector index query failed")?;

        if hits.is_empty() {
            tracing::debug!(%query, "no chunks matched");
            return Ok(RetrievalResult::NotFound);
        }

        let (context, used) = build_context(&hits, self.max_context_chars);
        let citations: CitationSet = used.iter().map(|h| &h.metadata).collect();

        let question = if query.is_empty() { SUMMARY_QUESTION } else { query };
        let sources = citations.render();
        let prompt = self.template.render(&[
            ("context", context.as_str()),
            ("question", question),
            ("sources", sources.as_str()),
        ])?;

        let output = self
            .generator
            .generate(GenerationRequest::new(&prompt))
            .await
            .context("Answer generation failed")?;

        let result = interpret_generation(&output, citations);
        tracing::debug!(
            hits = hits.len(),
            in_context = used.len(),
            found = result.is_found(),
            "synthesized answer"
        );
        Ok(result)
    }
}

/// Join `[Page N] content` blocks until `max_chars` would be exceeded.
///
/// The first block is always included, cut to `max_chars` if necessary,
/// so a single oversized chunk still yields an answer.
pub fn build_context(hits: &[IndexHit], max_chars: usize) -> (String, Vec<&IndexHit>) {
    let mut context = String::new();
    let mut used = Vec::new();

    for hit in hits {
        let block = format!("[Page {}] {}", hit.metadata.page_number, hit.content);
        let sep = if context.is_empty() { 0 } else { 2 };
        let block_len = block.chars().count();
        let current = context.chars().count();

        if current + sep + block_len > max_chars {
            if used.is_empty() {
                context = block.chars().take(max_chars).collect();
                used.push(hit);
            }
            break;
        }
        if sep > 0 {
            context.push_str("\n\n");
        }
        context.push_str(&block);
        used.push(hit);
    }

    (context, used)
}

/// Normalise generator output into a [`RetrievalResult`].
///
/// Any mention of "no relevant information" means not found, whatever
/// the exact wording. A leading `Based on the documents:` and a trailing
/// `Sources:` section written by the model are dropped; the caller's
/// citations replace them.
pub fn interpret_generation(output: &str, citations: CitationSet) -> RetrievalResult {
    let answer = strip_answer_frame(output);
    if answer.is_empty() || says_not_found(output) || citations.is_empty() {
        return RetrievalResult::NotFound;
    }
    RetrievalResult::Found {
        answer: answer.to_string(),
        citations,
    }
}

pub(crate) fn says_not_found(text: &str) -> bool {
    text.to_lowercase().contains("no relevant information")
}

/// Remove a leading found-prefix and everything from the first `Sources:`
/// on, wherever it appears.
pub(crate) fn strip_answer_frame(text: &str) -> &str {
    let mut body = text.trim();
    if body.len() >= FOUND_PREFIX.len()
        && body.is_char_boundary(FOUND_PREFIX.len())
        && body[..FOUND_PREFIX.len()].eq_ignore_ascii_case(FOUND_PREFIX)
    {
        body = body[FOUND_PREFIX.len()..].trim_start();
    }
    if let Some(pos) = find_sources(body) {
        body = &body[..pos];
    }
    body.trim()
}

/// Byte offset of the first case-insensitive `sources:`.
fn find_sources(text: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    text.to_ascii_lowercase().find("sources:")
}
