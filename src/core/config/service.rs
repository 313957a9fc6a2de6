use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::{validate_config, ConfigError};

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("SUBWAY_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config merged with secrets, before environment overrides.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Fully resolved configuration: files, then environment, then validation.
    pub fn settings(&self) -> Result<AppConfig, ConfigError> {
        let mut merged = self.load_config();
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        parse_settings(&merged)
    }
}

pub fn parse_settings(config: &Value) -> Result<AppConfig, ConfigError> {
    validate_config(config)?;
    serde_json::from_value(config.clone()).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

/// Overlays process environment variables onto the merged config tree.
///
/// Numeric variables that fail to parse are ignored so validation reports the
/// file value rather than a confusing type error.
pub fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(key) = get("OPENAI_API_KEY") {
        ensure_object_path(config, &["openai", "api_key"], json!(key));
    }
    if let Some(base) = get("OPENAI_API_BASE") {
        ensure_object_path(config, &["openai", "api_base"], json!(base));
    }
    if let Some(key) = get("GOOGLE_MAPS_API_KEY") {
        ensure_object_path(config, &["scraper", "google_maps_api_key"], json!(key));
    }
    if let Some(host) = get("HOST") {
        ensure_object_path(config, &["server", "host"], json!(host));
    }
    if let Some(port) = get("PORT").and_then(|v| v.trim().parse::<u64>().ok()) {
        ensure_object_path(config, &["server", "port"], json!(port));
    }
    if let Some(origins) = get("ALLOWED_ORIGINS") {
        let list: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
        ensure_object_path(config, &["server", "allowed_origins"], json!(list));
    }
    if let Some(ttl) = get("CACHE_TTL").and_then(|v| v.trim().parse::<u64>().ok()) {
        ensure_object_path(config, &["cache", "ttl_secs"], json!(ttl));
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}
