//! In-memory [`VectorIndex`] for tests and ephemeral runs.
//!
//! Chunks live in a `Vec` behind `std::sync::RwLock`; queries are a
//! brute-force cosine scan. Nothing survives the process.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Chunk, IndexedChunk};

use super::{active_filter, ensure_aligned, rank, IndexHit, VectorIndex};

/// In-memory index keeping chunks in insertion order.
pub struct InMemoryIndex {
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored chunks.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<IndexedChunk>>> {
        self.chunks
            .read()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<IndexedChunk>>> {
        self.chunks
            .write()
            .map_err(|_| anyhow!("in-memory index lock poisoned"))
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, doc_id: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        ensure_aligned(chunks, embeddings)?;
        let mut stored = self.write()?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            stored.push(IndexedChunk {
                chunk_id: Uuid::new_v4().to_string(),
                doc_id: doc_id.to_string(),
                page_number: chunk.page_number,
                content: chunk.content.clone(),
                embedding: embedding.clone(),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        query_embedding: &[f32],
        doc_ids: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<IndexHit>> {
        let filter = active_filter(doc_ids);
        let stored = self.read()?;
        let candidates = stored
            .iter()
            .filter(|c| filter.map_or(true, |ids| ids.iter().any(|id| *id == c.doc_id)))
            .map(|c| (c.content.clone(), c.metadata(), c.embedding.clone()));
        Ok(rank(query_embedding, candidates, top_k))
    }

    async fn wipe_and_reset(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}
