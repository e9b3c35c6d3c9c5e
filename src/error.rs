use std::path::PathBuf;
use thiserror::Error;

/// Typed error hierarchy for the operations exposed to the serving layer.
///
/// Serializes as a plain string so a JSON/HTTP front end can forward
/// `error.message` without knowing the variants, while Rust callers can still
/// match on them or propagate with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Json(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl serde::Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Allows `.map_err(|e| format!("…", e))?` and `ok_or_else(|| format!(…))?`
/// to coerce into AppError without changing the call sites.
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}

/// Allows `.ok_or("literal string")?` to coerce into AppError.
impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Other(s.to_string())
    }
}

// ── Subsystem errors ───────────────────────────────────────────────────────

/// Failures raised while building the index. None of them abort the process.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read source file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No transcript sources found under {0:?}")]
    NoSourcesFound(Vec<PathBuf>),
}

/// A user query that cannot be turned into a safe match expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Malformed query: {0}")]
    Malformed(String),
}

/// One rejected row of the link metadata source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Row {row}: missing or unparseable date {value:?}")]
    BadDate { row: usize, value: String },

    #[error("Row {row}: no plausible video URL")]
    MissingUrl { row: usize },

    #[error("Row {row}: unterminated quoted field")]
    UnterminatedQuote { row: usize },
}
