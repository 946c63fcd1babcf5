//! Threshold decision from class probabilities to a binary label.

use crate::classifier::ProbabilityPair;
use crate::defaults::CORRECT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a classification, serialized with the service's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Benar")]
    Correct,
    #[serde(rename = "Salah")]
    Incorrect,
}

impl Label {
    /// Wire name: "Benar" for correct, "Salah" for incorrect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Correct => "Benar",
            Label::Incorrect => "Salah",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels an utterance correct iff P(correct) is strictly above the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    threshold: f64,
}

impl DecisionPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn decide(&self, p: &ProbabilityPair) -> Label {
        if p.correct() > self.threshold {
            Label::Correct
        } else {
            Label::Incorrect
        }
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(CORRECT_THRESHOLD)
    }
}
