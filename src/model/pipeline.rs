use crate::config::ModelConfiguration;
use crate::error::{InferenceError, ModelLoadError};
use crate::model::classifier::{OnnxClassifier, SequenceClassifier};
use crate::model::labels::LabelSet;
use crate::model::loader::{self, MODEL_FILE, TOKENIZER_FILE};
use crate::preprocessing::text::TextEncoder;
use serde::Serialize;
use std::time::Instant;

/// Predicted label and its confidence as a percentage with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: String,
    pub probability: f64,
}

/// Tokenizer, classifier and label order, loaded once and shared read-only.
pub struct PredictionPipeline {
    encoder: TextEncoder,
    classifier: Box<dyn SequenceClassifier>,
    labels: LabelSet,
}

impl PredictionPipeline {
    pub fn new(config: &ModelConfiguration) -> Result<Self, ModelLoadError> {
        let tokenizer_file = loader::resolve_artifact(&config.tokenizer_path, TOKENIZER_FILE);
        let model_file = loader::resolve_artifact(&config.model_path, MODEL_FILE);

        let encoder = TextEncoder::from_file(&tokenizer_file, config.max_length)?;
        let labels = LabelSet::new(config.labels.clone());
        labels.verify_against(&loader::model_dir(&config.model_path))?;
        let classifier = OnnxClassifier::load(&model_file, config.intra_threads)?;

        tracing::info!(
            tokenizer = %tokenizer_file.display(),
            model = %model_file.display(),
            labels = ?config.labels,
            max_length = config.max_length,
            "prediction pipeline ready"
        );

        Ok(Self::with_classifier(encoder, Box::new(classifier), labels))
    }

    pub fn with_classifier(
        encoder: TextEncoder,
        classifier: Box<dyn SequenceClassifier>,
        labels: LabelSet,
    ) -> Self {
        Self {
            encoder,
            classifier,
            labels,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn predict(&self, text: &str) -> Result<PredictionResult, InferenceError> {
        if text.trim().is_empty() {
            return Err(InferenceError::EmptyInput);
        }

        let start = Instant::now();
        let encoded = self.encoder.encode(text)?;
        let logits = self.classifier.logits(&encoded)?;
        let elapsed = start.elapsed();

        if logits.len() != self.labels.len() {
            return Err(InferenceError::LabelCountMismatch {
                expected: self.labels.len(),
                got: logits.len(),
            });
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(InferenceError::NonFiniteScores);
        }

        let probs = softmax(&logits);
        let (class_id, confidence) = argmax(&probs).ok_or(InferenceError::LabelCountMismatch {
            expected: self.labels.len(),
            got: 0,
        })?;
        let label = self
            .labels
            .get(class_id)
            .ok_or(InferenceError::LabelCountMismatch {
                expected: self.labels.len(),
                got: logits.len(),
            })?
            .to_string();

        metrics::histogram!("inference_duration_seconds").record(elapsed.as_secs_f64());
        tracing::debug!(
            tokens = encoded.seq_len(),
            class_id,
            %label,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "prediction"
        );

        Ok(PredictionResult {
            label,
            probability: to_percentage(confidence),
        })
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest entry; the first one wins on ties.
fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

fn to_percentage(p: f32) -> f64 {
    let pct = (p as f64 * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::preprocessing::text::{fixtures::write_tokenizer, EncodedText};
    use tempfile::TempDir;

    /// Returns the same logits for every input.
    pub struct FixedLogits(pub Vec<f32>);

    impl SequenceClassifier for FixedLogits {
        fn logits(&self, _encoded: &EncodedText) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    /// Scores "Fake" by how many tokens are `cheese` or `moon`, "true" by the rest.
    pub struct KeywordLogits;

    impl SequenceClassifier for KeywordLogits {
        fn logits(&self, encoded: &EncodedText) -> Result<Vec<f32>, InferenceError> {
            let suspicious = encoded
                .input_ids
                .iter()
                .filter(|&&id| id == 5 || id == 9)
                .count() as f32;
            let other = encoded.seq_len() as f32 - suspicious;
            Ok(vec![suspicious, other * 0.5])
        }
    }

    pub fn pipeline_with(classifier: Box<dyn SequenceClassifier>) -> (TempDir, PredictionPipeline) {
        let dir = TempDir::new().unwrap();
        let tokenizer = write_tokenizer(dir.path());
        let encoder = TextEncoder::from_file(tokenizer, 256).unwrap();
        let labels = LabelSet::new(vec!["Fake".to_string(), "true".to_string()]);
        (dir, PredictionPipeline::with_classifier(encoder, classifier, labels))
    }
}
