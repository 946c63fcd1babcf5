//! Request pipeline from uploaded audio to a persisted verdict.
//!
//! One [`Pipeline`] is shared by every request; each call to
//! [`Pipeline::handle`] stages its upload under a unique name and releases
//! it before returning.

pub mod orchestrator;
pub mod staging;

pub use orchestrator::{MISSING_INPUT_MESSAGE, Pipeline, PipelineConfig, Prediction, Submission};
pub use staging::StagedAudio;
