//! Retrieval-augmented answering over the outlet corpus.
//!
//! `answer_query` runs: sanitize → embed → match → dedupe/hydrate → context →
//! prompt → generate with session history → record the turn.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context_builder::{build_context, compose_prompt};
use super::query::{sanitize_query, QueryError};
use crate::core::config::settings::RetrievalConfig;
use crate::llm::{AnswerGenerator, EmbeddingProvider};
use crate::memory::{SessionMemory, Turn};
use crate::outlets::{Match, Outlet, OutletStore};

/// The only thing callers get back; matched records are never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
}

pub struct RetrievalPipeline {
    store: Arc<dyn OutletStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    memory: SessionMemory,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        store: Arc<dyn OutletStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
        memory: SessionMemory,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            memory,
            config,
        }
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub async fn answer_query(&self, session_id: &str, raw_text: &str) -> Result<Answer, QueryError> {
        let query = sanitize_query(raw_text, self.config.max_query_chars)?;
        tracing::debug!(session_id, "Query sanitized");

        let embedding = self
            .embedder
            .embed(&query)
            .await
            .map_err(QueryError::upstream("embedding"))?;

        let matches = self
            .store
            .nearest_neighbors(
                &embedding,
                self.config.match_threshold,
                self.config.match_count,
            )
            .await
            .map_err(QueryError::upstream("similarity search"))?;

        let outlets = self.hydrate(&matches).await?;
        tracing::info!(
            session_id,
            matches = matches.len(),
            outlets = outlets.len(),
            "Retrieved outlet context"
        );

        let context = build_context(&outlets);
        let prompt = compose_prompt(&context, &query);

        // Held until the turn is recorded so a session's turns never interleave.
        let mut conversation = self.memory.lock(session_id).await;
        let history = conversation.turns();

        let response = self
            .generator
            .generate(&prompt, &history)
            .await
            .map_err(QueryError::upstream("generation"))?;

        conversation.record(Turn::new(prompt, response.clone()));
        tracing::info!(session_id, turns = conversation.len(), "Answer generated");

        Ok(Answer { answer: response })
    }

    /// Fetches full records for matched addresses, first occurrence wins.
    ///
    /// An address is only marked seen once it resolves, so a vanished address
    /// is looked up again if it reappears. Store errors abort.
    pub async fn hydrate(&self, matches: &[Match]) -> Result<Vec<Outlet>, QueryError> {
        let mut seen = HashSet::new();
        let mut outlets = Vec::new();

        for candidate in matches {
            if seen.contains(candidate.address.as_str()) {
                continue;
            }

            match self
                .store
                .select_by_key(&candidate.address)
                .await
                .map_err(QueryError::upstream("outlet lookup"))?
            {
                Some(outlet) => {
                    seen.insert(candidate.address.as_str());
                    outlets.push(outlet);
                }
                None => tracing::debug!(
                    address = %candidate.address,
                    "Matched outlet no longer exists, skipping"
                ),
            }
        }

        Ok(outlets)
    }
}
