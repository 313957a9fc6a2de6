//! Persistence contract shared by the API and the scraper.
//!
//! The primary implementation is `SqliteOutletStore` in the `sqlite` module.

use async_trait::async_trait;

use super::model::{Match, Outlet};
use crate::core::errors::ApiError;

/// Abstract outlet storage with embedding-backed similarity search.
///
/// Implementations must guarantee:
/// - `address` is unique (writes are upserts keyed by address)
/// - only outlets with an embedding take part in `nearest_neighbors`
/// - an upsert that changes an outlet's canonical text drops its embedding
#[async_trait]
pub trait OutletStore: Send + Sync {
    async fn select_all(&self) -> Result<Vec<Outlet>, ApiError>;

    async fn select_by_key(&self, address: &str) -> Result<Option<Outlet>, ApiError>;

    /// Matches scoring at least `threshold`, best first, at most `limit`.
    async fn nearest_neighbors(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<Match>, ApiError>;

    /// Idempotent insert-or-update keyed by address.
    async fn upsert_by_key(&self, outlet: &Outlet) -> Result<(), ApiError>;

    /// Upserts every outlet in one transaction.
    async fn upsert_batch(&self, outlets: &[Outlet]) -> Result<(), ApiError>;

    /// Returns false when no outlet has this address.
    async fn set_embedding(&self, address: &str, embedding: &[f32]) -> Result<bool, ApiError>;

    async fn count(&self) -> Result<usize, ApiError>;

    async fn count_embedded(&self) -> Result<usize, ApiError>;

    async fn missing_embeddings(&self) -> Result<Vec<Outlet>, ApiError>;

    /// Model id the current corpus generation was embedded with.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;

    async fn set_embedding_model(&self, model: &str) -> Result<(), ApiError>;

    /// Drops every embedding, e.g. when the embedding model changes.
    async fn clear_embeddings(&self) -> Result<(), ApiError>;
}
