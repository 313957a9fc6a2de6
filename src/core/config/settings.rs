//! Typed view of the merged configuration.
//!
//! Every field has a default so a missing `config.yml` still yields a
//! runnable service (apart from credentials).

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub cache: CacheConfig,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8001".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: Option<f64>,
    /// Completion length cap; unset leaves it to the server.
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 30,
        }
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The hosted OpenAI API always needs a key; compatible local servers may not.
    pub fn requires_api_key(&self) -> bool {
        self.api_base.trim_end_matches('/') == DEFAULT_OPENAI_API_BASE
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub match_threshold: f32,
    pub match_count: usize,
    pub max_query_chars: usize,
    pub query_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            match_count: 6,
            max_query_chars: 500,
            query_timeout_secs: 90,
        }
    }
}

impl RetrievalConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Turns kept per session; 0 keeps everything.
    pub max_turns: usize,
    /// Sessions kept before the least recently used one is evicted; 0 keeps every session.
    pub max_sessions: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_sessions: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub locator_url: String,
    pub area: String,
    pub geocode_url: String,
    pub google_maps_api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            locator_url: "https://subway.com.my/find-a-subway".to_string(),
            area: "Kuala Lumpur".to_string(),
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
            google_maps_api_key: None,
            timeout_secs: 30,
        }
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
