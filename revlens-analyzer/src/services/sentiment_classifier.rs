//! Default sentiment classifier
//!
//! Multinomial logistic regression over review embeddings. Weights come from a
//! JSON model file exported by the training scripts:
//!
//! ```json
//! { "classes": ["0", "1", "2"], "coefficients": [[...], [...], [...]], "intercepts": [0.1, 0.0, -0.1] }
//! ```
//!
//! Class labels may be numeric ids (`0` negative, `1` neutral, `2` positive) or
//! sentiment names. A binary model (one coefficient row, two classes) is
//! scored with a sigmoid.

use super::collaborators::SentimentClassifier;
use crate::models::{Classification, Sentiment};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
struct ModelFile {
    classes: Vec<serde_json::Value>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

/// Loaded logistic-regression weights
#[derive(Debug, Clone)]
pub struct LinearSentimentClassifier {
    classes: Vec<Sentiment>,
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearSentimentClassifier {
    /// Load weights from a JSON model file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sentiment model {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid sentiment model {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(content)?;

        let classes = file
            .classes
            .iter()
            .map(|value| {
                let label = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Sentiment::from_label(&label).ok_or_else(|| anyhow!("Unknown class label: {}", label))
            })
            .collect::<Result<Vec<_>>>()?;

        let binary = classes.len() == 2 && file.coefficients.len() == 1;
        if !binary && file.coefficients.len() != classes.len() {
            bail!(
                "Expected {} coefficient rows, found {}",
                classes.len(),
                file.coefficients.len()
            );
        }
        if file.intercepts.len() != file.coefficients.len() {
            bail!(
                "Expected {} intercepts, found {}",
                file.coefficients.len(),
                file.intercepts.len()
            );
        }
        let dimension = file.coefficients.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 || file.coefficients.iter().any(|row| row.len() != dimension) {
            bail!("Coefficient rows must be non-empty and of equal length");
        }

        Ok(Self {
            classes,
            coefficients: file.coefficients,
            intercepts: file.intercepts,
        })
    }

    /// Embedding dimension the model expects
    pub fn dimension(&self) -> usize {
        self.coefficients[0].len()
    }

    fn probabilities(&self, vector: &[f32]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                row.iter()
                    .zip(vector)
                    .map(|(w, x)| w * f64::from(*x))
                    .sum::<f64>()
                    + intercept
            })
            .collect();

        if scores.len() == 1 {
            let p = 1.0 / (1.0 + (-scores[0]).exp());
            return vec![1.0 - p, p];
        }

        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }
}

impl SentimentClassifier for LinearSentimentClassifier {
    fn classify(&self, vectors: &[Vec<f32>]) -> Result<Vec<Classification>> {
        let dimension = self.dimension();
        vectors
            .iter()
            .enumerate()
            .map(|(i, vector)| {
                if vector.len() != dimension {
                    bail!(
                        "Embedding {} has dimension {}, model expects {}",
                        i,
                        vector.len(),
                        dimension
                    );
                }
                let probs = self.probabilities(vector);
                let best = probs
                    .iter()
                    .enumerate()
                    .fold(0, |best, (k, p)| if *p > probs[best] { k } else { best });

                let probabilities: BTreeMap<Sentiment, f64> =
                    self.classes.iter().copied().zip(probs.iter().copied()).collect();
                Ok(Classification {
                    label: self.classes[best],
                    probabilities,
                })
            })
            .collect()
    }
}

/// Stand-in used when no model file could be loaded
///
/// Every call fails, which fails the classify stage of any job that reaches it.
#[derive(Debug, Clone)]
pub struct MissingModelClassifier {
    path: PathBuf,
    reason: String,
}

impl MissingModelClassifier {
    pub fn new(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

impl SentimentClassifier for MissingModelClassifier {
    fn classify(&self, _vectors: &[Vec<f32>]) -> Result<Vec<Classification>> {
        bail!(
            "Sentiment model not available ({}): {}",
            self.path.display(),
            self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "classes": [0, 1, 2],
        "coefficients": [[-2.0, 0.0], [0.0, 0.5], [2.0, 0.0]],
        "intercepts": [0.0, 0.0, 0.0]
    }"#;

    #[test]
    fn test_argmax_label_and_probabilities_sum_to_one() {
        let model = LinearSentimentClassifier::from_json(MODEL).unwrap();
        let results = model.classify(&[vec![1.0, 0.0], vec![-1.0, 0.0]]).unwrap();

        assert_eq!(results[0].label, Sentiment::Positive);
        assert_eq!(results[1].label, Sentiment::Negative);
        let total: f64 = results[0].probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(results[0].probabilities.len(), 3);
    }

    #[test]
    fn test_named_classes_and_binary_model() {
        let model = LinearSentimentClassifier::from_json(
            r#"{"classes": ["negative", "positive"], "coefficients": [[1.0]], "intercepts": [0.0]}"#,
        )
        .unwrap();
        let results = model.classify(&[vec![3.0]]).unwrap();

        assert_eq!(results[0].label, Sentiment::Positive);
        assert!(results[0].probabilities[&Sentiment::Positive] > 0.9);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let model = LinearSentimentClassifier::from_json(MODEL).unwrap();
        assert!(model.classify(&[vec![1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn test_malformed_models_rejected() {
        assert!(LinearSentimentClassifier::from_json(
            r#"{"classes": [0, 1, 2], "coefficients": [[1.0]], "intercepts": [0.0]}"#
        )
        .is_err());
        assert!(LinearSentimentClassifier::from_json(
            r#"{"classes": ["meh"], "coefficients": [[1.0]], "intercepts": [0.0]}"#
        )
        .is_err());
    }

    #[test]
    fn test_missing_model_always_fails() {
        let classifier = MissingModelClassifier::new(PathBuf::from("/nope.json"), "not found");
        assert!(classifier.classify(&[]).is_err());
    }
}
