//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Transcoding engine failed to initialize: {0}")]
    EngineInit(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Could not read input '{name}': {message}")]
    InputFetch { name: String, message: String },

    #[error("Graph execution failed: {message}")]
    GraphExecution {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Mix verification failed: {0}")]
    MixVerification(String),

    #[error("Output artifact '{0}' is empty")]
    EmptyOutput(String),

    #[error("Invalid clip: {0}")]
    Clip(#[from] reelforge_models::ClipError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Step '{step}' timed out after {ms} ms")]
    Timeout { step: String, ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video: {0}")]
    InvalidVideo(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a graph execution failure.
    pub fn graph_execution(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::GraphExecution {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an input fetch failure.
    pub fn input_fetch(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputFetch {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a timeout for a named sub-step.
    pub fn timeout(step: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            step: step.into(),
            ms,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
