//! Retrieval-augmented answering over outlet records.
//!
//! - `query`: input sanitization and the pipeline error type
//! - `context_builder`: context block and prompt composition
//! - `pipeline`: `RetrievalPipeline`, the end-to-end query flow

mod context_builder;
mod pipeline;
mod query;

pub use context_builder::{build_context, compose_prompt};
pub use pipeline::{Answer, RetrievalPipeline};
pub use query::{sanitize_query, QueryError};
