//! Filesystem layout. Everything the service writes lives under one data directory.

use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// `SUBWAY_ROOT` (default: working directory) holds `config.yml`;
    /// `SUBWAY_DATA_DIR` (default: `<root>/data`) holds the database, logs and secrets.
    pub fn new() -> Self {
        let project_root = env_dir("SUBWAY_ROOT")
            .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let user_data_dir = env_dir("SUBWAY_DATA_DIR").unwrap_or_else(|| project_root.join("data"));
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Lays out every derived path under `user_data_dir`, creating the directories.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create {}: {}", log_dir.display(), err);
        }

        Self {
            db_path: user_data_dir.join("outlets.db"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn env_dir(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
