use std::path::PathBuf;
use thiserror::Error;

use crate::quality::QualityReport;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("APIFY_TOKEN is not set")]
    MissingToken,

    #[error("network error: {0}")]
    Network(String),

    #[error("scraper API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("scraper run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    #[error("scraper returned no items: check the API token and account names")]
    Empty,

    #[error("failed to read dump {}: {source}", path.display())]
    Dump {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("data quality too low to report: {}", .0.summary())]
    QualityGate(QualityReport),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(String),
}
