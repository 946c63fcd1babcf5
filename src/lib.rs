//! lafal - pronunciation classification service
//!
//! Turns an uploaded utterance into a correct/incorrect verdict: mean MFCCs,
//! a random forest, a fixed threshold, and a per-user history record.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod auth;
pub mod classifier;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decision;
pub mod defaults;
pub mod error;
pub mod features;
pub mod history;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod server;

// Composition root - needs everything
pub mod app;

// Core traits (extract → classify → persist)
pub use auth::{ApiKeyAuthenticator, Authenticator};
pub use classifier::{Classifier, FixedClassifier, ProbabilityPair, RandomForest};
pub use features::{FeatureExtractor, FeatureVector, MfccExtractor};
pub use history::{HistoryRecord, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};

// Pipeline
pub use decision::{DecisionPolicy, Label};
pub use pipeline::{Pipeline, PipelineConfig, Prediction, Submission};

// Error handling
pub use error::{LafalError, Result};

// Config
pub use config::{Config, PersistencePolicy};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
