use crate::error::ModelLoadError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// HuggingFace model metadata file exported alongside the weights.
pub const MODEL_METADATA_FILE: &str = "config.json";

#[derive(Deserialize)]
struct ModelMetadata {
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
}

/// Ordered class labels; index `i` names the model's `i`-th logit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Checks the configured order against the `id2label` table in
    /// `model_dir/config.json`, when the model ships one.
    ///
    /// Placeholder names (`LABEL_0`, `LABEL_1`, ...) carry no ordering
    /// information, so only their count is checked.
    pub fn verify_against(&self, model_dir: &Path) -> Result<(), ModelLoadError> {
        let path = model_dir.join(MODEL_METADATA_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no model metadata, label order unchecked");
            return Ok(());
        }

        let metadata_err = |reason: String| ModelLoadError::Metadata {
            path: path.clone(),
            reason,
        };

        let content = fs::read_to_string(&path).map_err(|e| metadata_err(e.to_string()))?;
        let metadata: ModelMetadata =
            serde_json::from_str(&content).map_err(|e| metadata_err(e.to_string()))?;

        let Some(id2label) = metadata.id2label else {
            return Ok(());
        };

        let mut indexed = Vec::with_capacity(id2label.len());
        for (id, label) in id2label {
            let id: usize = id
                .parse()
                .map_err(|_| metadata_err(format!("non-numeric id2label key '{}'", id)))?;
            indexed.push((id, label));
        }
        indexed.sort_by_key(|(id, _)| *id);
        let model_labels: Vec<String> = indexed.into_iter().map(|(_, label)| label).collect();

        let placeholders = model_labels
            .iter()
            .enumerate()
            .all(|(i, label)| *label == format!("LABEL_{}", i));

        let matches = if placeholders {
            model_labels.len() == self.labels.len()
        } else {
            model_labels == self.labels
        };

        if !matches {
            return Err(ModelLoadError::LabelMismatch {
                configured: self.labels.clone(),
                model: model_labels,
            });
        }

        tracing::debug!(labels = ?self.labels, "label order verified against model metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn labels() -> LabelSet {
        LabelSet::new(vec!["Fake".to_string(), "true".to_string()])
    }

    fn write_metadata(dir: &TempDir, body: &str) {
        fs::write(dir.path().join(MODEL_METADATA_FILE), body).unwrap();
    }

    #[test]
    fn test_index_lookup() {
        let set = labels();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0), Some("Fake"));
        assert_eq!(set.get(1), Some("true"));
        assert_eq!(set.get(2), None);
        assert!(set.contains("true"));
    }

    #[test]
    fn test_no_metadata_is_accepted() {
        let dir = TempDir::new().unwrap();
        assert!(labels().verify_against(dir.path()).is_ok());
    }

    #[test]
    fn test_matching_metadata() {
        let dir = TempDir::new().unwrap();
        write_metadata(&dir, r#"{"id2label": {"1": "true", "0": "Fake"}}"#);
        assert!(labels().verify_against(dir.path()).is_ok());
    }

    #[test]
    fn test_swapped_order_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_metadata(&dir, r#"{"id2label": {"0": "true", "1": "Fake"}}"#);
        match labels().verify_against(dir.path()) {
            Err(ModelLoadError::LabelMismatch { model, .. }) => {
                assert_eq!(model, vec!["true", "Fake"]);
            }
            other => panic!("Expected LabelMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_labels_only_check_count() {
        let dir = TempDir::new().unwrap();
        write_metadata(&dir, r#"{"id2label": {"0": "LABEL_0", "1": "LABEL_1"}}"#);
        assert!(labels().verify_against(dir.path()).is_ok());

        write_metadata(
            &dir,
            r#"{"id2label": {"0": "LABEL_0", "1": "LABEL_1", "2": "LABEL_2"}}"#,
        );
        assert!(labels().verify_against(dir.path()).is_err());
    }

    #[test]
    fn test_metadata_without_id2label() {
        let dir = TempDir::new().unwrap();
        write_metadata(&dir, r#"{"model_type": "distilbert"}"#);
        assert!(labels().verify_against(dir.path()).is_ok());
    }

    #[test]
    fn test_malformed_metadata() {
        let dir = TempDir::new().unwrap();
        write_metadata(&dir, "{ not json");
        assert!(matches!(
            labels().verify_against(dir.path()),
            Err(ModelLoadError::Metadata { .. })
        ));
    }
}
