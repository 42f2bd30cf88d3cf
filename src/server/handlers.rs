use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::model::pipeline::PredictionResult;
use crate::preprocessing::document::{self, DocumentFormat};
use crate::server::types::*;
use crate::telemetry::{self, Source};

pub const HEALTH_MESSAGE: &str = "✅ Fake News Detector API is running";

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

pub async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: HEALTH_MESSAGE.to_string(),
    })
}

pub async fn predict_from_text(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TextQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let result = classify_text(&state, query).await;
    finish(Source::Text, result)
}

pub async fn predict_from_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let result = classify_upload(&state, multipart).await;
    finish(Source::File, result)
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn classify_text(state: &AppState, query: TextQuery) -> Result<PredictionResult, ApiError> {
    let pipeline = state.pipeline()?;
    let text = query
        .text
        .ok_or_else(|| ApiError::InvalidInput("Missing query parameter 'text'".to_string()))?;

    run_blocking(move || Ok(pipeline.predict(&text)?)).await
}

async fn classify_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<PredictionResult, ApiError> {
    // Model availability is reported before anything about the request body.
    let pipeline = state.pipeline()?;
    let mut multipart = multipart.map_err(|e| ApiError::InvalidForm(e.body_text()))?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let format = DocumentFormat::from_filename(&filename).ok_or(ApiError::UnsupportedFormat)?;
        let bytes = field.bytes().await?;
        tracing::info!(%filename, size = bytes.len(), "received upload");

        return run_blocking(move || {
            let text = document::extract_text(&bytes, format)?;
            Ok(pipeline.predict(&text)?)
        })
        .await;
    }

    Err(ApiError::MissingFile)
}

/// Extraction and inference are CPU-bound; keep them off the async workers.
async fn run_blocking<F>(work: F) -> Result<PredictionResult, ApiError>
where
    F: FnOnce() -> Result<PredictionResult, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

fn finish(
    source: Source,
    result: Result<PredictionResult, ApiError>,
) -> Result<Json<PredictionResponse>, ApiError> {
    match result {
        Ok(prediction) => {
            telemetry::record_prediction(source, &prediction);
            Ok(Json(prediction.into()))
        }
        Err(e) => {
            telemetry::record_failure(source, &e);
            Err(e)
        }
    }
}
