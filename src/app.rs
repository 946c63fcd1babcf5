//! Service composition root.
//!
//! Wires configuration, the classifier artifact, the feature extractor and
//! the history sink into a [`Pipeline`], then serves it or runs it once.

use crate::auth::ApiKeyAuthenticator;
use crate::classifier::{Classifier, RandomForest};
use crate::config::Config;
use crate::decision::DecisionPolicy;
use crate::error::{LafalError, Result};
use crate::features::MfccExtractor;
use crate::history::{HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
use crate::models::ensure_model;
use crate::pipeline::{Pipeline, PipelineConfig, Prediction, Submission};
use crate::server::{self, AppState};
use std::path::Path;
use std::sync::Arc;

/// Load configuration the way every command does.
///
/// An explicit path must exist; the default path falls back to defaults
/// when missing. Environment overrides apply last, then validation.
pub fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Resolve, download if allowed, and load the classifier artifact.
///
/// # Errors
/// `ModelUnavailable` when the artifact is missing or malformed, and
/// `FeatureMismatch` when its dimensionality differs from the extractor's.
pub async fn load_classifier(
    config: &Config,
    extractor: &MfccExtractor,
    allow_download: bool,
    progress: bool,
) -> Result<RandomForest> {
    let path = ensure_model(&config.model, allow_download, progress).await?;
    let forest = tokio::task::spawn_blocking(move || RandomForest::load(&path))
        .await
        .map_err(|e| LafalError::Other(format!("model loading task failed: {e}")))??;

    let expected = extractor.config().n_mfcc;
    if forest.n_features() != expected {
        return Err(LafalError::FeatureMismatch {
            expected: forest.n_features(),
            actual: expected,
        });
    }
    Ok(forest)
}

/// Build the request pipeline around an already loaded classifier.
pub fn build_pipeline(
    config: &Config,
    extractor: MfccExtractor,
    classifier: Arc<dyn Classifier>,
    history: Arc<dyn HistoryStore>,
) -> Result<Pipeline> {
    let pipeline_config = PipelineConfig::from_settings(&config.pipeline)?;
    if config.pipeline.staging_dir.is_some() {
        std::fs::create_dir_all(&pipeline_config.staging_dir)?;
    }
    Ok(Pipeline::new(Arc::new(extractor), classifier, history)
        .with_policy(DecisionPolicy::new(config.decision.threshold))
        .with_config(pipeline_config))
}

/// Run the HTTP service until Ctrl-C.
///
/// Everything that can fail at startup (missing API key, unavailable model,
/// bad bind address) fails here, before the listener accepts anything.
pub async fn run_serve(
    mut config: Config,
    bind: Option<String>,
    no_download: bool,
    quiet: bool,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let api_key = config
        .server
        .api_key
        .clone()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| LafalError::ConfigInvalidValue {
            key: "server.api_key".to_string(),
            message: "an API key is required to serve (set LAFAL_API_KEY)".to_string(),
        })?;

    let extractor = MfccExtractor::default();
    let forest = load_classifier(&config, &extractor, !no_download, !quiet).await?;
    tracing::info!(
        service = %crate::version_string(),
        version = forest.version(),
        trees = forest.n_trees(),
        threshold = config.decision.threshold,
        "Classifier ready"
    );

    let history = Arc::new(JsonlHistoryStore::new(config.history.path.clone()));
    tracing::info!(path = %history.path().display(), "Recording history");

    let pipeline = build_pipeline(&config, extractor, Arc::new(forest), history)?;
    let state = AppState::new(
        Arc::new(pipeline),
        Arc::new(ApiKeyAuthenticator::new(api_key)),
        config.server.max_upload_bytes,
    );

    let listener = server::bind(&config.server.bind).await?;
    if !quiet && let Ok(addr) = listener.local_addr() {
        eprintln!("Serving on http://{addr}");
        eprintln!("  - POST /predict  classify an utterance (X-API-KEY required)");
        eprintln!("  - GET  /health   liveness and model version");
    }

    server::serve(listener, server::router(state), server::shutdown_signal()).await
}

/// Classify one file through the same pipeline the service uses.
pub async fn run_predict(
    config: &Config,
    audio: &Path,
    email: &str,
    no_history: bool,
    no_download: bool,
    quiet: bool,
) -> Result<Prediction> {
    let bytes = tokio::fs::read(audio).await?;

    let extractor = MfccExtractor::default();
    let forest = load_classifier(config, &extractor, !no_download, !quiet).await?;

    let history: Arc<dyn HistoryStore> = if no_history {
        Arc::new(MemoryHistoryStore::new())
    } else {
        Arc::new(JsonlHistoryStore::new(config.history.path.clone()))
    };

    let pipeline = build_pipeline(config, extractor, Arc::new(forest), history)?;
    pipeline.handle(Submission::new(email, bytes)).await
}
