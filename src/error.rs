use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Specscribe operations
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Malformed response ({reason}): {snippet}")]
    MalformedResponse { reason: String, snippet: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Workspace export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SpecError>;
