//! Error types for lafal.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LafalError {
    // Request errors
    #[error("{message}")]
    Validation { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Request timed out after {}", humantime::format_duration(*after))]
    Timeout { after: Duration },

    // Pipeline errors
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    #[error("Feature mismatch: model expects {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Inference failed: {message}")]
    Inference { message: String },

    #[error("History write failed: {message}")]
    Persistence { message: String },

    // Startup errors
    #[error("Model unavailable at {path}: {message}")]
    ModelUnavailable { path: String, message: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl LafalError {
    /// Shorthand for the "required input missing" failure.
    pub fn validation(message: impl Into<String>) -> Self {
        LafalError::Validation {
            message: message.into(),
        }
    }

    /// HTTP status code this error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            LafalError::Validation { .. } => 400,
            LafalError::Unauthorized => 403,
            LafalError::PayloadTooLarge { .. } => 413,
            LafalError::Timeout { .. } => 504,
            LafalError::ModelUnavailable { .. } => 503,
            LafalError::AudioDecode { .. }
            | LafalError::FeatureMismatch { .. }
            | LafalError::Inference { .. }
            | LafalError::Persistence { .. }
            | LafalError::ConfigInvalidValue { .. }
            | LafalError::Config(_)
            | LafalError::Io(_)
            | LafalError::Other(_) => 500,
        }
    }

    /// Stable tag distinguishing bad input, model and storage failures.
    pub fn kind(&self) -> &'static str {
        match self {
            LafalError::Validation { .. } => "validation",
            LafalError::Unauthorized => "unauthorized",
            LafalError::PayloadTooLarge { .. } => "payload_too_large",
            LafalError::Timeout { .. } => "timeout",
            LafalError::AudioDecode { .. } => "audio_decode",
            LafalError::FeatureMismatch { .. } => "feature_mismatch",
            LafalError::Inference { .. } => "inference",
            LafalError::Persistence { .. } => "persistence",
            LafalError::ModelUnavailable { .. } => "model_unavailable",
            LafalError::ConfigInvalidValue { .. }
            | LafalError::Config(_)
            | LafalError::Io(_)
            | LafalError::Other(_) => "internal",
        }
    }

    /// True for failures caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LafalError>;
