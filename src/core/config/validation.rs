use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Missing required setting: {0}")]
    Missing(String),
}

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_string_array_field(server, "server.allowed_origins", "allowed_origins")?;
    }

    if let Some(openai) = expect_optional_object(root, "openai")? {
        validate_optional_string_field(openai, "openai.api_base", "api_base")?;
        validate_optional_string_field(openai, "openai.api_key", "api_key")?;
        validate_optional_string_field(openai, "openai.chat_model", "chat_model")?;
        validate_optional_string_field(openai, "openai.embedding_model", "embedding_model")?;
        validate_f64_field(openai, "openai.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(openai, "openai.timeout_secs", "timeout_secs", 1, 3_600)?;
        if openai.get("max_tokens").is_some_and(|value| !value.is_null()) {
            validate_u64_field(openai, "openai.max_tokens", "max_tokens", 1, 128_000)?;
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_f64_field(
            retrieval,
            "retrieval.match_threshold",
            "match_threshold",
            -1.0,
            1.0,
        )?;
        validate_u64_field(retrieval, "retrieval.match_count", "match_count", 1, 100)?;
        validate_u64_field(
            retrieval,
            "retrieval.max_query_chars",
            "max_query_chars",
            1,
            100_000,
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.query_timeout_secs",
            "query_timeout_secs",
            1,
            3_600,
        )?;
    }

    if let Some(memory) = expect_optional_object(root, "memory")? {
        validate_u64_field(memory, "memory.max_turns", "max_turns", 0, 10_000)?;
        validate_u64_field(memory, "memory.max_sessions", "max_sessions", 0, 1_000_000)?;
    }

    if let Some(cache) = expect_optional_object(root, "cache")? {
        validate_u64_field(cache, "cache.ttl_secs", "ttl_secs", 0, 86_400)?;
    }

    if let Some(scraper) = expect_optional_object(root, "scraper")? {
        validate_optional_string_field(scraper, "scraper.locator_url", "locator_url")?;
        validate_optional_string_field(scraper, "scraper.area", "area")?;
        validate_optional_string_field(scraper, "scraper.geocode_url", "geocode_url")?;
        validate_optional_string_field(
            scraper,
            "scraper.google_maps_api_key",
            "google_maps_api_key",
        )?;
        validate_u64_field(scraper, "scraper.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(range_error(path, min, max));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: format!("{}[{}]", path, index),
                reason: "value cannot be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn range_error<T: std::fmt::Display>(path: &str, min: T, max: T) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: format!("must be between {} and {}", min, max),
    }
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: format!("expected {}", expected),
    }
}
