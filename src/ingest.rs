//! Ingestion: reader → structure → chunk → embed → index.
//!
//! ```text
//! DocumentReader ──(blocking pool)──▶ pages ──▶ sections ──▶ chunks
//!                                                              │
//!                                  VectorIndex::add ◀── embed_many
//! ```
//!
//! Any failure becomes a [`DocumentProcessingError`]. The reader is
//! consumed by the read stage, so a staged upload is removed as soon as
//! reading ends, whatever happens afterwards.

use anyhow::{anyhow, Context};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

use docqa_core::chunk::split_sections;
use docqa_core::structure::{structure, DocumentReader};

use crate::error::DocumentProcessingError;
use crate::service::Harness;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub doc_id: String,
    pub pages: usize,
    pub sections: usize,
    pub chunks: usize,
}

impl Harness {
    /// Ingest one document. A document with no usable text succeeds with
    /// zero chunks.
    pub async fn ingest<R>(
        &self,
        doc_id: &str,
        reader: R,
    ) -> Result<IngestReport, DocumentProcessingError>
    where
        R: DocumentReader + 'static,
    {
        self.run_ingest(doc_id, reader)
            .await
            .map_err(|e| DocumentProcessingError::new(doc_id, e))
    }

    /// Run [`ingest`](Harness::ingest) as an independent task.
    pub fn spawn_ingest<R>(
        self: Arc<Self>,
        doc_id: String,
        reader: R,
    ) -> JoinHandle<Result<IngestReport, DocumentProcessingError>>
    where
        R: DocumentReader + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.ingest(&doc_id, reader).await;
            match &outcome {
                Ok(report) => tracing::info!(
                    doc_id = %report.doc_id,
                    chunks = report.chunks,
                    "background ingestion finished"
                ),
                Err(e) => tracing::error!(
                    doc_id = %e.doc_id,
                    error = %e,
                    "background ingestion failed"
                ),
            }
            outcome
        })
    }

    async fn run_ingest<R>(&self, doc_id: &str, reader: R) -> anyhow::Result<IngestReport>
    where
        R: DocumentReader + 'static,
    {
        let pages = tokio::task::spawn_blocking(move || reader.read_pages())
            .await
            .map_err(|e| anyhow!("document reader task failed: {}", e))?
            .context("Failed to read document")?;

        let sections = structure(&pages);
        let chunks = split_sections(
            &sections,
            self.settings.chunking.chunk_size,
            self.settings.chunking.overlap,
        )?;

        let report = IngestReport {
            doc_id: doc_id.to_string(),
            pages: pages.len(),
            sections: sections.len(),
            chunks: chunks.len(),
        };

        if chunks.is_empty() {
            tracing::info!(%doc_id, pages = pages.len(), "no text to index");
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_many(&texts)
            .await
            .context("Failed to embed chunks")?;
        self.index
            .add(doc_id, &chunks, &embeddings)
            .await
            .context("Failed to store chunks")?;

        tracing::info!(
            %doc_id,
            pages = report.pages,
            sections = report.sections,
            chunks = report.chunks,
            "document ingested"
        );
        Ok(report)
    }
}
