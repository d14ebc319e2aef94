use thiserror::Error;

use crate::inference::InferenceError;

/// Errors raised by the capture, analysis and storage layers.
#[derive(Debug, Error)]
pub enum PileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("prompt template error: {0}")]
    Template(#[from] tinytemplate::error::Error),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, PileError>;
