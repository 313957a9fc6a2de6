use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{AnswerGenerator, EmbeddingProvider};
use super::types::ChatRequest;
use crate::core::config::settings::OpenAiConfig;
use crate::core::errors::ApiError;
use crate::memory::Turn;

const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about Subway \
restaurant outlets in Kuala Lumpur. Earlier turns of this conversation are included so \
follow-up questions can be resolved.";

/// Client for any OpenAI-compatible API, serving both embeddings and chat.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn chat_request(&self, prompt: &str, history: &[Turn]) -> ChatRequest {
        ChatRequest::from_history(SYSTEM_PROMPT, history, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send_json(&self, path: &str, body: &Value) -> Result<reqwest::Response, ApiError> {
        let res = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "{} returned {}: {}",
                path, status, text
            )));
        }

        Ok(res)
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn chat_body(request: &ChatRequest, model: &str) -> Value {
    let mut body = json!({
        "model": model,
        "messages": request.messages,
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(t) = request.temperature {
            obj.insert("temperature".to_string(), json!(t));
        }
        if let Some(t) = request.max_tokens {
            obj.insert("max_tokens".to_string(), json!(t));
        }
    }

    body
}

fn parse_embedding(payload: EmbeddingResponse) -> Result<Vec<f32>, ApiError> {
    let embedding = payload
        .data
        .into_iter()
        .next()
        .map(|item| item.embedding)
        .ok_or_else(|| ApiError::Upstream("embedding response contained no data".to_string()))?;

    if embedding.is_empty() {
        return Err(ApiError::Upstream("embedding response was empty".to_string()));
    }
    Ok(embedding)
}

fn parse_completion(payload: ChatResponse) -> Result<String, ApiError> {
    payload
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| ApiError::Upstream("chat response contained no choices".to_string()))
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let res = self.send_json("/embeddings", &body).await?;
        let payload: EmbeddingResponse = res.json().await.map_err(ApiError::upstream)?;
        parse_embedding(payload)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiProvider {
    async fn generate(&self, prompt: &str, history: &[Turn]) -> Result<String, ApiError> {
        let body = chat_body(&self.chat_request(prompt, history), &self.chat_model);

        let res = self.send_json("/chat/completions", &body).await?;
        let payload: ChatResponse = res.json().await.map_err(ApiError::upstream)?;
        parse_completion(payload)
    }
}
