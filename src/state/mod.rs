use std::sync::Arc;

use crate::bootstrap::ensure_embeddings;
use crate::core::config::settings::AppConfig;
use crate::core::config::AppPaths;
use crate::llm::{AnswerGenerator, EmbeddingProvider, OpenAiProvider};
use crate::memory::SessionMemory;
use crate::outlets::{OutletCache, OutletStore, SqliteOutletStore};
use crate::rag::RetrievalPipeline;

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// Holds the outlet store behind its read cache, the retrieval pipeline and
/// the session memory the pipeline records into.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn OutletStore>,
    pub cache: OutletCache,
    pub pipeline: RetrievalPipeline,
}

impl AppState {
    /// Opens the store, builds the model client and backfills embeddings.
    ///
    /// Nothing is served until the backfill has succeeded.
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        if config.openai.requires_api_key() && !config.openai.has_api_key() {
            return Err(InitializationError::Config(anyhow::anyhow!(
                "OPENAI_API_KEY is required for {}",
                config.openai.api_base
            )));
        }

        let store: Arc<dyn OutletStore> = Arc::new(
            SqliteOutletStore::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::Store(e.into()))?,
        );

        let provider = Arc::new(
            OpenAiProvider::new(&config.openai)
                .map_err(|e| InitializationError::Provider(e.into()))?,
        );

        let report = ensure_embeddings(store.as_ref(), provider.as_ref())
            .await
            .map_err(|e| InitializationError::Backfill(e.into()))?;
        tracing::info!(
            embedded = report.embedded,
            skipped = report.skipped_existing,
            regenerated = report.regenerated,
            "Embedding backfill complete"
        );

        Ok(Arc::new(Self::from_parts(
            config,
            store,
            provider.clone(),
            provider,
        )))
    }

    /// Wires already-constructed collaborators without touching the network.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn OutletStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let memory = SessionMemory::new(config.memory.max_turns, config.memory.max_sessions);
        let cache = OutletCache::new(store.clone(), config.cache.ttl());
        let pipeline = RetrievalPipeline::new(
            store.clone(),
            embedder,
            generator,
            memory,
            config.retrieval.clone(),
        );

        Self {
            config: Arc::new(config),
            store,
            cache,
            pipeline,
        }
    }

    pub fn memory(&self) -> &SessionMemory {
        self.pipeline.memory()
    }
}
