//! Runtime configuration.
//!
//! Values come from `config.yaml` in the data directory, then `.env` in the
//! data root, then real environment variables (highest precedence).

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding both transcript subtrees
    pub data_root: PathBuf,
    /// Show transcripts, relative to `data_root`
    pub shows_dir: String,
    /// Best-of compilations, relative to `data_root`
    pub best_of_dir: String,
    pub show_extensions: Vec<String>,
    pub best_of_extensions: Vec<String>,
    /// Filename tokens that precede the 8-digit air date of a show file
    pub host_prefixes: Vec<String>,
    /// Quoted CSV with curated video links, keyed by date
    pub metadata_csv: Option<PathBuf>,
    pub database_path: PathBuf,
    /// Pending segments per write transaction
    pub batch_size: usize,
    /// Minimum trigram similarity for a fuzzy hit
    pub fuzzy_threshold: f64,
    /// Rebuild even when the on-disk index is current
    pub force_reindex: bool,
    /// Extra equivalence classes for query expansion
    pub synonyms: Vec<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        let base = default_base_dir();
        Self {
            data_root: base.join("data"),
            shows_dir: "timestamps".to_string(),
            best_of_dir: "best_of".to_string(),
            show_extensions: vec!["txt".to_string()],
            best_of_extensions: vec!["md".to_string()],
            host_prefixes: vec!["rick".to_string(), "guest".to_string()],
            metadata_csv: None,
            database_path: base.join("show_archive.db"),
            batch_size: 500,
            fuzzy_threshold: 0.3,
            force_reindex: false,
            synonyms: Vec::new(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("show-archive")
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `None`. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_base_dir().join(CONFIG_FILE_NAME));

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let parsed: Config = serde_yaml::from_str(&raw)?;
            log::info!("Loaded configuration from {}", path.display());
            parsed
        } else {
            log::info!("No configuration at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| load_env_value(&self.data_root, key))
        };

        let data_root = lookup("SHOW_ARCHIVE_DATA_ROOT");
        let database = lookup("SHOW_ARCHIVE_DB");
        let metadata = lookup("SHOW_ARCHIVE_METADATA_CSV");
        let force = lookup("SHOW_ARCHIVE_FORCE_REINDEX");
        let batch = lookup("SHOW_ARCHIVE_BATCH_SIZE");

        if let Some(v) = data_root {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = database {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = metadata {
            self.metadata_csv = Some(PathBuf::from(v));
        }
        if let Some(v) = force {
            self.force_reindex = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(n) = batch.and_then(|v| v.trim().parse::<usize>().ok()) {
            self.batch_size = n;
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::Config("batch_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(AppError::Config(format!(
                "fuzzy_threshold must be within 0..=1, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.host_prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(AppError::Config("host_prefixes must not be empty".into()));
        }
        Ok(())
    }

    pub fn shows_root(&self) -> PathBuf {
        self.data_root.join(&self.shows_dir)
    }

    pub fn best_of_root(&self) -> PathBuf {
        self.data_root.join(&self.best_of_dir)
    }
}

/// Load a value from the .env file in `dir` by key name
pub fn load_env_value(dir: &Path, key: &str) -> Option<String> {
    let env_path = dir.join(".env");
    let prefix = format!("{}=", key);
    let content = std::fs::read_to_string(env_path).ok()?;
    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(&prefix) {
            let value = rest.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
