//! Request handlers and the API key gate.

use crate::defaults::API_KEY_HEADER;
use crate::error::{LafalError, Result};
use crate::pipeline::{Prediction, Submission};
use crate::server::AppState;
use crate::server::protocol::{ErrorResponse, HealthResponse};
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

impl IntoResponse for LafalError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

/// Rejects requests whose `X-API-KEY` header the authenticator refuses.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let credential = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if !state.auth.authenticate(credential) {
        tracing::warn!(
            path = %request.uri().path(),
            has_credential = credential.is_some(),
            "Rejected unauthenticated request"
        );
        return LafalError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// `POST /predict`: multipart form with `email` and `audio` parts.
pub async fn predict(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>> {
    let multipart = multipart.map_err(|e| LafalError::validation(format!("Malformed request: {e}")))?;
    let submission = read_submission(multipart, state.max_upload_bytes).await?;
    let prediction = state.pipeline.handle(submission).await?;
    Ok(Json(prediction))
}

/// `GET /health`: liveness plus the loaded model's identity.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier = state.pipeline.classifier();
    Json(HealthResponse {
        status: "ok".to_string(),
        service_version: crate::version_string(),
        model_version: classifier.version().to_string(),
        n_features: classifier.n_features(),
    })
}

async fn read_submission(mut multipart: Multipart, limit: usize) -> Result<Submission> {
    let malformed = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            LafalError::PayloadTooLarge { limit }
        } else {
            LafalError::validation(format!("Malformed multipart body: {}", e.body_text()))
        }
    };

    let mut submission = Submission::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        // Audio counts only as a file part; a file input left empty by the
        // browser arrives with an empty file name
        let is_file = field.file_name().is_some_and(|file_name| !file_name.is_empty());
        match name.as_deref() {
            Some("email") => {
                submission.user_id = Some(field.text().await.map_err(malformed)?);
            }
            Some("audio") if !is_file => {}
            Some("audio") => {
                submission.audio = Some(field.bytes().await.map_err(malformed)?.to_vec());
            }
            _ => {}
        }
    }
    Ok(submission)
}
