// src/utils/error.rs
use thiserror::Error;

// Errors raised by the external classification collaborators
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("Classification service rate limit exceeded")]
    RateLimited,

    #[error("Malformed classifier response: {0}")]
    Malformed(String),

    #[error("No classification available for {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No usable statement sections found in {0}")]
    NothingToExtract(String),

    #[error("Extraction deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),

    #[error("Document conversion failed: {0}")]
    Conversion(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Classifier failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid arguments: {0}")]
    Usage(String),
}
