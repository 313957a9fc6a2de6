use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Invalid configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open outlet store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize model provider: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("Embedding backfill failed: {0}")]
    Backfill(#[source] anyhow::Error),
}
