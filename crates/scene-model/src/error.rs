//! Errors raised while loading or validating model data.

use std::path::PathBuf;

use framepipe_common::error::FramepipeError;

/// Errors that can occur when working with export configs and scenes.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid export configuration: {message}")]
    ValidationError { message: String },

    #[error("Invalid scene: {message}")]
    InvalidScene { message: String },

    #[error("Scene `{name}` not found (available: {available})")]
    UnknownScene { name: String, available: String },
}

impl ModelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError {
            message: msg.into(),
        }
    }

    pub fn invalid_scene(msg: impl Into<String>) -> Self {
        Self::InvalidScene {
            message: msg.into(),
        }
    }
}

impl From<ModelError> for FramepipeError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::IoError { source, .. } => FramepipeError::Io(source),
            ModelError::ValidationError { message } => FramepipeError::config(message),
            other => FramepipeError::scene(other.to_string()),
        }
    }
}
