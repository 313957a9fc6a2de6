use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::memory::Turn;

/// Maps text to a fixed-length vector.
///
/// Corpus and query embeddings must come from the same `model_id` for their
/// scores to be comparable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// identifier recorded alongside the embedded corpus
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;
}

/// Produces a completion for `prompt`, folding the prior turns into its own context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, ApiError>;
}
