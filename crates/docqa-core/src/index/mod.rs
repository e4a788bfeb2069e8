//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only way the rest of docqa touches
//! stored embeddings. Backends:
//!
//! | Backend | Crate | Durable |
//! |---------|-------|---------|
//! | [`memory::InMemoryIndex`] | `docqa-core` | no |
//! | `SqliteIndex` | `docqa` | yes |
//!
//! # Concurrency
//!
//! Implementations must be `Send + Sync` and safe under interleaved
//! `add` and `query` calls from different tasks; callers add no locking
//! of their own. [`wipe_and_reset`](VectorIndex::wipe_and_reset) does not
//! block concurrent callers: a query racing a wipe may see the index
//! empty or partially refilled. That window is accepted.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Chunk, ChunkMetadata};
use crate::vector::cosine_similarity;

/// One query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexHit {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query embedding.
    pub score: f32,
}

/// Storage backend for chunk embeddings.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorIndex::add) | Store chunks with fresh ids; durable on return |
/// | [`query`](VectorIndex::query) | Filtered top-k by cosine similarity |
/// | [`wipe_and_reset`](VectorIndex::wipe_and_reset) | Drop everything, leave an empty collection |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store `chunks` for `doc_id`, one embedding per chunk.
    ///
    /// Fails when `chunks.len() != embeddings.len()`.
    async fn add(&self, doc_id: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Return up to `top_k` chunks, most similar first.
    ///
    /// `doc_ids` restricts eligibility; `None` or an empty slice searches
    /// the whole index. No matches is an empty result, not an error.
    async fn query(
        &self,
        query_embedding: &[f32],
        doc_ids: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>>;

    /// Delete every stored chunk and recreate the empty collection.
    ///
    /// Failing to delete is ignored; failing to recreate is returned.
    async fn wipe_and_reset(&self) -> Result<()>;
}

/// Check the `add` precondition shared by all backends.
pub fn ensure_aligned(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
    anyhow::ensure!(
        chunks.len() == embeddings.len(),
        "chunk/embedding count mismatch: {} chunks, {} embeddings",
        chunks.len(),
        embeddings.len()
    );
    Ok(())
}

/// Normalise a doc-id filter: empty means unfiltered.
pub fn active_filter(doc_ids: Option<&[String]>) -> Option<&[String]> {
    doc_ids.filter(|ids| !ids.is_empty())
}

/// Score candidates and keep the best `top_k`.
///
/// Candidates must arrive in insertion order. The sort is stable, so equal
/// scores keep that order and results are deterministic for a fixed index.
pub fn rank<I>(query_embedding: &[f32], candidates: I, top_k: usize) -> Vec<IndexHit>
where
    I: IntoIterator<Item = (String, ChunkMetadata, Vec<f32>)>,
{
    let mut hits: Vec<IndexHit> = candidates
        .into_iter()
        .map(|(content, metadata, embedding)| IndexHit {
            score: cosine_similarity(query_embedding, &embedding),
            content,
            metadata,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}
