//! Random forest inference from a JSON tree export.
//!
//! The artifact mirrors the fitted estimator's per-tree arrays:
//!
//! ```json
//! { "version": "1.6.0", "n_features": 13, "n_classes": 2,
//!   "trees": [ { "children_left": [1, -1, -1], "children_right": [2, -1, -1],
//!                "feature": [0, -2, -2], "threshold": [0.5, -2.0, -2.0],
//!                "value": [[5, 5], [4, 1], [1, 4]] } ] }
//! ```
//!
//! A node is a leaf when `children_left` is -1. Samples go left when
//! `x[feature]`, compared at f32 precision, is `<= threshold`. Each tree votes
//! with its leaf's normalized class weights; the forest averages the votes.

use crate::classifier::{Classifier, ProbabilityPair};
use crate::error::{LafalError, Result};
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk representation of the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub version: String,
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<TreeArtifact>,
}

/// On-disk representation of one tree, in parallel-array form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf([f64; 2]),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_artifact(tree: &TreeArtifact, n_features: usize) -> std::result::Result<Self, String> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if tree.children_right.len() != n
            || tree.feature.len() != n
            || tree.threshold.len() != n
            || tree.value.len() != n
        {
            return Err("tree arrays have mismatched lengths".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = tree.children_left[i];
            let right = tree.children_right[i];
            if left == -1 {
                let row = &tree.value[i];
                let [c0, c1] = row.as_slice() else {
                    return Err(format!("leaf {i} must carry exactly 2 class weights"));
                };
                let total = c0 + c1;
                if *c0 < 0.0 || *c1 < 0.0 || total.is_nan() || total <= 0.0 {
                    return Err(format!("leaf {i} has invalid class weights {row:?}"));
                }
                nodes.push(Node::Leaf([c0 / total, c1 / total]));
                continue;
            }

            // Children always follow their parent, which also rules out cycles.
            let child = |c: i64| -> std::result::Result<usize, String> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| format!("node {i} has out-of-range child {c}"))
            };
            let feature = usize::try_from(tree.feature[i])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| format!("node {i} splits on invalid feature {}", tree.feature[i]))?;
            let threshold = tree.threshold[i];
            if !threshold.is_finite() {
                return Err(format!("node {i} has non-finite threshold"));
            }
            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(left)?,
                right: child(right)?,
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_for(&self, x: &[f32]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(proba) => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] as f64 <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Immutable random forest; loaded once, shared read-only.
#[derive(Debug, Clone)]
pub struct RandomForest {
    version: String,
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    /// Load and validate a forest artifact from disk.
    ///
    /// # Errors
    /// `LafalError::ModelUnavailable` if the file is missing, unreadable,
    /// not valid JSON, or structurally inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let unavailable = |message: String| LafalError::ModelUnavailable {
            path: path.display().to_string(),
            message,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let artifact: ForestArtifact =
            serde_json::from_str(&contents).map_err(|e| unavailable(format!("corrupt artifact: {e}")))?;
        let forest = Self::from_artifact(&artifact).map_err(unavailable)?;

        tracing::info!(
            path = %path.display(),
            version = %forest.version,
            trees = forest.trees.len(),
            n_features = forest.n_features,
            "Loaded classifier"
        );
        Ok(forest)
    }

    /// Validate an in-memory artifact.
    pub fn from_artifact(artifact: &ForestArtifact) -> std::result::Result<Self, String> {
        if artifact.n_classes != 2 {
            return Err(format!(
                "expected a 2-class model, got {} classes",
                artifact.n_classes
            ));
        }
        if artifact.n_features == 0 {
            return Err("model declares zero features".to_string());
        }
        if artifact.trees.is_empty() {
            return Err("model has no trees".to_string());
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(t, tree)| {
                Tree::from_artifact(tree, artifact.n_features).map_err(|e| format!("tree {t}: {e}"))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            version: artifact.version.clone(),
            n_features: artifact.n_features,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn predict_probabilities(&self, features: &FeatureVector) -> Result<ProbabilityPair> {
        if features.len() != self.n_features {
            return Err(LafalError::FeatureMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        let x = features.as_slice();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LafalError::Inference {
                message: "feature vector contains non-finite values".to_string(),
            });
        }

        let (mut incorrect, mut correct) = (0.0, 0.0);
        for tree in &self.trees {
            let [p0, p1] = tree.leaf_for(x);
            incorrect += p0;
            correct += p1;
        }
        let n = self.trees.len() as f64;
        ProbabilityPair::from_weights(incorrect / n, correct / n)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn version(&self) -> &str {
        &self.version
    }
}
