//! JSON bodies of the HTTP interface.
//!
//! A successful `/predict` answers with [`crate::pipeline::Prediction`]
//! directly; everything else is defined here.

use crate::error::LafalError;
use serde::{Deserialize, Serialize};

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl From<&LafalError> for ErrorResponse {
    fn from(error: &LafalError) -> Self {
        Self {
            error: error.to_string(),
            kind: error.kind().to_string(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service_version: String,
    pub model_version: String,
    pub n_features: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_from_validation() {
        let body = ErrorResponse::from(&LafalError::validation("Audio file and email are required"));
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "error": "Audio file and email are required",
                "kind": "validation"
            })
        );
    }

    #[test]
    fn test_error_response_unauthorized() {
        let body = ErrorResponse::from(&LafalError::Unauthorized);
        assert_eq!(body.error, "Unauthorized");
        assert_eq!(body.kind, "unauthorized");
    }
}
