//! Per-request classification pipeline.
//!
//! validate → stage → extract → classify → decide → persist → respond.
//! The staged file is released on every path, including failures, panics
//! in the extractor and requests abandoned by the timeout.

use crate::classifier::{Classifier, ProbabilityPair};
use crate::config::{PersistencePolicy, PipelineSettings};
use crate::decision::{DecisionPolicy, Label};
use crate::error::{LafalError, Result};
use crate::features::FeatureExtractor;
use crate::history::{HistoryEntry, HistoryStore};
use crate::pipeline::staging::{StagedAudio, default_staging_dir};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Message returned when either required input is absent.
pub const MISSING_INPUT_MESSAGE: &str = "Audio file and email are required";

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory uploads are staged in
    pub staging_dir: PathBuf,
    /// Upper bound on one request (None = unbounded)
    pub timeout: Option<Duration>,
    /// Whether a failed history write fails the request
    pub persistence: PersistencePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            timeout: None,
            persistence: PersistencePolicy::Required,
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        Ok(Self {
            staging_dir: settings
                .staging_dir
                .clone()
                .unwrap_or_else(default_staging_dir),
            timeout: settings.timeout_duration()?,
            persistence: settings.persistence,
        })
    }
}

/// Raw inputs of one classification request, before validation.
///
/// `audio` is `None` when no audio part was supplied at all. A supplied
/// but empty payload passes validation and fails later at decoding.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub user_id: Option<String>,
    pub audio: Option<Vec<u8>>,
}

impl Submission {
    pub fn new(user_id: impl Into<String>, audio: Vec<u8>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            audio: Some(audio),
        }
    }

    fn validate(self) -> Result<(String, Vec<u8>)> {
        match (self.user_id, self.audio) {
            (Some(user_id), Some(audio)) if !user_id.trim().is_empty() => Ok((user_id, audio)),
            _ => Err(LafalError::validation(MISSING_INPUT_MESSAGE)),
        }
    }
}

/// Successful outcome, serialized as `{"result": ..., "confidence": [p0, p1]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub result: Label,
    pub confidence: ProbabilityPair,
}

/// Shared, stateless request handler.
///
/// Holds no per-request state; one instance serves all concurrent requests.
pub struct Pipeline {
    extractor: Arc<dyn FeatureExtractor>,
    classifier: Arc<dyn Classifier>,
    policy: DecisionPolicy,
    history: Arc<dyn HistoryStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        classifier: Arc<dyn Classifier>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            policy: DecisionPolicy::default(),
            history,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request through the pipeline.
    ///
    /// # Errors
    /// `Validation` for missing inputs, `Timeout` when the configured bound
    /// elapses, otherwise the error of the first failing stage.
    pub async fn handle(&self, submission: Submission) -> Result<Prediction> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("predict", request_id = %request_id);
        let started = Instant::now();

        let work = self.process(request_id, submission).instrument(span);
        let outcome = match self.config.timeout {
            Some(after) => tokio::time::timeout(after, work)
                .await
                .unwrap_or(Err(LafalError::Timeout { after })),
            None => work.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(prediction) => tracing::info!(
                %request_id,
                result = %prediction.result,
                p_correct = prediction.confidence.correct(),
                elapsed_ms,
                "Prediction complete"
            ),
            Err(e) if e.is_client_error() => {
                tracing::warn!(%request_id, kind = e.kind(), "Rejected request: {e}")
            }
            Err(e) => {
                tracing::error!(%request_id, kind = e.kind(), elapsed_ms, "Prediction failed: {e}")
            }
        }
        outcome
    }

    async fn process(&self, request_id: Uuid, submission: Submission) -> Result<Prediction> {
        let (user_id, audio) = submission.validate()?;

        let extractor = Arc::clone(&self.extractor);
        let classifier = Arc::clone(&self.classifier);
        let staging_dir = self.config.staging_dir.clone();

        // The staged file lives entirely inside the blocking task, so it is
        // released even when this future is dropped by the timeout.
        let confidence = tokio::task::spawn_blocking(move || {
            let staged = StagedAudio::stage(&staging_dir, request_id, &audio)?;
            let outcome = extractor
                .extract(staged.path())
                .and_then(|features| classifier.predict_probabilities(&features));
            staged.release();
            outcome
        })
        .await
        .map_err(|e| LafalError::Other(format!("processing task failed: {e}")))??;

        let result = self.policy.decide(&confidence);
        tracing::debug!(
            p_correct = confidence.correct(),
            threshold = self.policy.threshold(),
            %result,
            "Decided"
        );

        let entry = HistoryEntry {
            label: result,
            confidence,
        };
        if let Err(e) = self.history.append(&user_id, entry).await {
            match self.config.persistence {
                PersistencePolicy::Required => return Err(e),
                PersistencePolicy::BestEffort => {
                    tracing::warn!("History write failed, returning result anyway: {e}")
                }
            }
        }

        Ok(Prediction { result, confidence })
    }
}
