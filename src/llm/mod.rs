pub mod openai;
pub mod provider;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::{AnswerGenerator, EmbeddingProvider};
pub use types::{ChatMessage, ChatRequest};
