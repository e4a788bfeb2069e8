//! The [`Harness`]: one explicitly constructed value owning the vector
//! index handle and both model providers.
//!
//! ```text
//!                 ┌──────────── Harness ────────────┐
//!  ingest() ────▶ │ index: Arc<dyn VectorIndex>     │
//!  ask()    ────▶ │ embedder: Arc<dyn Embedder>     │
//!  search() ────▶ │ generator: Arc<dyn Generator>   │
//!  wipe()   ────▶ │ settings                        │
//!                 └─────────────────────────────────┘
//! ```
//!
//! The CLI builds one per command; the HTTP server builds one at startup
//! and shares it as `Arc<Harness>`. Nothing else holds the index.

use anyhow::Result;
use std::sync::Arc;

use docqa_core::citation::RetrievalResult;
use docqa_core::index::memory::InMemoryIndex;
use docqa_core::index::VectorIndex;

use crate::agent::tools::Toolbox;
use crate::agent::{Answer, LoopSettings, ReasoningLoop};
use crate::config::{AgentConfig, ChunkingConfig, Config, RetrievalConfig};
use crate::embedding::{create_embedder, Embedder};
use crate::error::AgentError;
use crate::generation::{create_generator, Generator};
use crate::retrieval::Synthesizer;
use crate::sqlite_index::SqliteIndex;

/// Tunables the harness applies to every call.
#[derive(Debug, Clone, Default)]
pub struct HarnessSettings {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub agent: AgentConfig,
}

impl HarnessSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking.clone(),
            retrieval: config.retrieval.clone(),
            agent: config.agent.clone(),
        }
    }
}

pub struct Harness {
    pub(crate) index: Arc<dyn VectorIndex>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) settings: HarnessSettings,
}

impl Harness {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: HarnessSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            settings,
        }
    }

    /// Open the configured index and build the configured providers.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let index: Arc<dyn VectorIndex> = match config.index.backend.as_str() {
            "memory" => Arc::new(InMemoryIndex::new()),
            _ => Arc::new(SqliteIndex::open(&config.index.path, &config.index.collection).await?),
        };
        tracing::debug!(
            backend = %config.index.backend,
            collection = %config.index.collection,
            "index opened"
        );
        Ok(Self::new(
            index,
            create_embedder(&config.embedding)?,
            create_generator(&config.generation)?,
            HarnessSettings::from_config(config),
        ))
    }

    fn synthesizer(&self) -> Synthesizer<'_> {
        Synthesizer::new(
            self.index.as_ref(),
            self.embedder.as_ref(),
            self.generator.as_ref(),
            self.settings.retrieval.max_context_chars,
        )
    }

    /// Answer a question with the reasoning loop.
    ///
    /// Iteration and timeout exhaustion still return `Ok` with a canonical
    /// answer; only an unrecoverable failure is an [`AgentError`].
    pub async fn ask(&self, question: &str) -> Result<Answer, AgentError> {
        let toolbox = Toolbox::new(
            self.synthesizer(),
            self.index.as_ref(),
            self.settings.retrieval.top_k,
        );
        let settings = LoopSettings {
            max_iterations: self.settings.agent.max_iterations,
            timeout: self.settings.agent.timeout(),
        };
        ReasoningLoop::new(self.generator.as_ref(), toolbox, settings)
            .run(question)
            .await
    }

    /// One retrieval pass without the reasoning loop.
    pub async fn search(
        &self,
        query: &str,
        doc_ids: Option<&[String]>,
        top_k: Option<usize>,
    ) -> Result<RetrievalResult> {
        let top_k = top_k.unwrap_or(self.settings.retrieval.top_k);
        self.synthesizer().answer(query, doc_ids, top_k).await
    }

    pub async fn wipe(&self) -> Result<()> {
        self.index.wipe_and_reset().await
    }
}
