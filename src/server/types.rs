use crate::error::ApiError;
use crate::model::pipeline::{PredictionPipeline, PredictionResult};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared Application State
#[derive(Clone)]
pub struct AppState {
    /// `None` when the model failed to load and the server runs degraded.
    pub pipeline: Option<Arc<PredictionPipeline>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(pipeline: Option<Arc<PredictionPipeline>>) -> Self {
        Self {
            pipeline,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn pipeline(&self) -> Result<Arc<PredictionPipeline>, ApiError> {
        self.pipeline.clone().ok_or(ApiError::ModelUnavailable)
    }
}

// --- DTOs (Data Transfer Objects) ---

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct TextQuery {
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PredictionResponse {
    pub label: String,
    pub probability: f64,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        Self {
            label: result.label,
            probability: result.probability,
        }
    }
}
