use crate::error::ApiError;
use crate::model::pipeline::PredictionResult;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "newscheck=info,tower_http=info";

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Installs the global Prometheus recorder. Metrics stay disabled if a
/// recorder is already installed.
pub fn install_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!("metrics disabled: {}", e);
            None
        }
    }
}

/// Where a prediction request came from, used as a metric label.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    Text,
    File,
}

impl Source {
    fn as_str(&self) -> &'static str {
        match self {
            Source::Text => "text",
            Source::File => "file",
        }
    }
}

pub fn record_prediction(source: Source, result: &PredictionResult) {
    metrics::counter!(
        "predictions_total",
        "source" => source.as_str(),
        "label" => result.label.clone()
    )
    .increment(1);
}

pub fn record_failure(source: Source, error: &ApiError) {
    metrics::counter!(
        "prediction_errors_total",
        "source" => source.as_str(),
        "status" => error.status().as_u16().to_string()
    )
    .increment(1);
}
