//! Classifier artifact management.

pub mod download;

pub use download::{ModelStatus, ensure_model, model_status};
#[cfg(feature = "model-download")]
pub use download::download_model;
