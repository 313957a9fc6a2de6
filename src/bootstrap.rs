//! Startup backfill of outlet embeddings.

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::llm::EmbeddingProvider;
use crate::outlets::OutletStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Outlets embedded during this run.
    pub embedded: usize,
    /// Outlets whose stored embedding was kept.
    pub skipped_existing: usize,
    /// Whether existing embeddings were dropped because the model changed.
    pub regenerated: bool,
}

/// Makes sure every stored outlet carries an embedding from `embedder`'s model.
///
/// Embeddings recorded under a different (or unknown) model are cleared and
/// rebuilt so corpus and query vectors always share one model. The model is
/// recorded before any vector is written, so an interrupted run never leaves
/// vectors behind under another model's name. Safe to re-run: outlets that
/// already have a current embedding are left alone.
pub async fn ensure_embeddings(
    store: &dyn OutletStore,
    embedder: &dyn EmbeddingProvider,
) -> Result<BackfillReport, ApiError> {
    let model = embedder.model_id();
    let recorded = store.embedding_model().await?;
    let already_embedded = store.count_embedded().await?;

    let regenerated = already_embedded > 0 && recorded.as_deref() != Some(model);
    if regenerated {
        tracing::warn!(
            "Embedding model changed ({} -> {}), regenerating {} embeddings",
            recorded.as_deref().unwrap_or("unknown"),
            model,
            already_embedded
        );
        store.clear_embeddings().await?;
    }

    let total = store.count().await?;
    let pending = store.missing_embeddings().await?;
    let skipped_existing = total.saturating_sub(pending.len());

    if pending.is_empty() {
        tracing::info!("All {} outlets already embedded with {}", total, model);
    } else {
        tracing::info!("Generating embeddings for {} of {} outlets", pending.len(), total);
    }

    if recorded.as_deref() != Some(model) {
        store.set_embedding_model(model).await?;
    }

    let mut embedded = 0;
    for outlet in &pending {
        let embedding = embedder.embed(&outlet.canonical_text()).await?;
        if embedding.is_empty() {
            return Err(ApiError::Upstream(format!(
                "empty embedding returned for {}",
                outlet.address
            )));
        }

        if store.set_embedding(&outlet.address, &embedding).await? {
            embedded += 1;
        } else {
            tracing::debug!(address = %outlet.address, "Outlet removed during backfill");
        }
    }

    Ok(BackfillReport {
        embedded,
        skipped_existing,
        regenerated,
    })
}
