//! Probabilistic two-class classification over feature vectors.

pub mod forest;

use crate::error::{LafalError, Result};
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use forest::RandomForest;

/// Tolerance for the "probabilities sum to one" invariant.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Two-class output distribution.
///
/// Index 0 is the probability of "incorrect", index 1 of "correct".
/// Serializes as the two-element array `[p0, p1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct ProbabilityPair([f64; 2]);

impl ProbabilityPair {
    /// Build a pair, checking both values are non-negative and sum to one.
    pub fn new(incorrect: f64, correct: f64) -> Result<Self> {
        let valid = incorrect.is_finite()
            && correct.is_finite()
            && incorrect >= 0.0
            && correct >= 0.0
            && ((incorrect + correct) - 1.0).abs() <= PROBABILITY_TOLERANCE;
        if !valid {
            return Err(LafalError::Inference {
                message: format!("invalid probability pair [{incorrect}, {correct}]"),
            });
        }
        Ok(Self([incorrect, correct]))
    }

    /// Normalize non-negative class weights into a distribution.
    pub fn from_weights(incorrect: f64, correct: f64) -> Result<Self> {
        let total = incorrect + correct;
        if total.is_nan() || total <= 0.0 || incorrect < 0.0 || correct < 0.0 {
            return Err(LafalError::Inference {
                message: format!("cannot normalize class weights [{incorrect}, {correct}]"),
            });
        }
        Self::new(incorrect / total, correct / total)
    }

    pub fn incorrect(&self) -> f64 {
        self.0[0]
    }

    pub fn correct(&self) -> f64 {
        self.0[1]
    }

    pub fn as_array(&self) -> [f64; 2] {
        self.0
    }
}

impl TryFrom<[f64; 2]> for ProbabilityPair {
    type Error = LafalError;

    fn try_from(value: [f64; 2]) -> Result<Self> {
        Self::new(value[0], value[1])
    }
}

impl From<ProbabilityPair> for [f64; 2] {
    fn from(pair: ProbabilityPair) -> Self {
        pair.0
    }
}

/// Trait for the loaded statistical model.
///
/// Inference is read-only; implementations must be callable concurrently
/// through a shared reference without extra locking.
pub trait Classifier: Send + Sync {
    /// Class probabilities for one feature vector.
    ///
    /// # Errors
    /// `LafalError::FeatureMismatch` when the vector length differs from
    /// [`Classifier::n_features`]; `LafalError::Inference` on any other failure.
    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ProbabilityPair>;

    /// Expected feature dimensionality.
    fn n_features(&self) -> usize;

    /// Version string of the loaded artifact.
    fn version(&self) -> &str;
}

/// Implement Classifier for Arc<T> to allow sharing across requests.
impl<T: Classifier> Classifier for Arc<T> {
    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ProbabilityPair> {
        (**self).predict_probabilities(features)
    }

    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn version(&self) -> &str {
        (**self).version()
    }
}

/// Classifier returning a preset distribution, for tests and dry runs.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    probabilities: ProbabilityPair,
    n_features: usize,
    should_fail: bool,
}

impl FixedClassifier {
    pub fn new(probabilities: ProbabilityPair) -> Self {
        Self {
            probabilities,
            n_features: crate::defaults::N_MFCC,
            should_fail: false,
        }
    }

    /// Expect a different dimensionality, to exercise mismatch handling.
    pub fn with_n_features(mut self, n_features: usize) -> Self {
        self.n_features = n_features;
        self
    }

    /// Fail every inference call.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Classifier for FixedClassifier {
    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ProbabilityPair> {
        if features.len() != self.n_features {
            return Err(LafalError::FeatureMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if self.should_fail {
            return Err(LafalError::Inference {
                message: "fixed classifier failure".to_string(),
            });
        }
        Ok(self.probabilities)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn version(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_accepts_valid_distribution() {
        let p = ProbabilityPair::new(0.2, 0.8).unwrap();
        assert_eq!(p.incorrect(), 0.2);
        assert_eq!(p.correct(), 0.8);
    }

    #[test]
    fn test_pair_rejects_bad_sum_and_negatives() {
        assert!(ProbabilityPair::new(0.5, 0.6).is_err());
        assert!(ProbabilityPair::new(-0.1, 1.1).is_err());
        assert!(ProbabilityPair::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_pair_from_weights_normalizes() {
        let p = ProbabilityPair::from_weights(3.0, 1.0).unwrap();
        assert_eq!(p.as_array(), [0.75, 0.25]);
        assert!(ProbabilityPair::from_weights(0.0, 0.0).is_err());
    }

    #[test]
    fn test_pair_serializes_as_array() {
        let p = ProbabilityPair::new(0.35, 0.65).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "[0.35,0.65]");
        let back: ProbabilityPair = serde_json::from_str("[0.9,0.1]").unwrap();
        assert_eq!(back.as_array(), [0.9, 0.1]);
        assert!(serde_json::from_str::<ProbabilityPair>("[0.9,0.9]").is_err());
    }

    #[test]
    fn test_fixed_classifier_returns_preset() {
        let p = ProbabilityPair::new(0.9, 0.1).unwrap();
        let classifier = FixedClassifier::new(p);
        let out = classifier
            .predict_probabilities(&FeatureVector::new(vec![0.0; 13]))
            .unwrap();
        assert_eq!(out, p);
    }

    #[test]
    fn test_fixed_classifier_dimension_mismatch() {
        let classifier = FixedClassifier::new(ProbabilityPair::new(0.5, 0.5).unwrap());
        match classifier.predict_probabilities(&FeatureVector::new(vec![0.0; 12])) {
            Err(LafalError::FeatureMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (13, 12));
            }
            other => panic!("Expected FeatureMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_classifier_trait_is_object_safe() {
        let classifier: Arc<dyn Classifier> = Arc::new(
            FixedClassifier::new(ProbabilityPair::new(0.5, 0.5).unwrap()).with_failure(),
        );
        assert_eq!(classifier.n_features(), 13);
        assert!(matches!(
            classifier.predict_probabilities(&FeatureVector::new(vec![0.0; 13])),
            Err(LafalError::Inference { .. })
        ));
    }
}
