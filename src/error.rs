use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Startup failure while reading the settings file. Fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Startup failure while loading the tokenizer or the model artifacts.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model not found at path: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Tokenizer not found at path: {}", .0.display())]
    TokenizerNotFound(PathBuf),

    #[error("ONNX Runtime error: {0}")]
    OrtError(#[from] ort::Error),

    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("Unsupported model input '{0}'")]
    UnsupportedInput(String),

    #[error("Failed to read model metadata {}: {reason}", .path.display())]
    Metadata { path: PathBuf, reason: String },

    #[error("Label mismatch: configured {configured:?}, model declares {model:?}")]
    LabelMismatch {
        configured: Vec<String>,
        model: Vec<String>,
    },
}

/// Per-request failure inside the prediction pipeline.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Tokenization error: {0}")]
    Tokenization(String),

    #[error("ONNX Runtime error: {0}")]
    OrtError(#[from] ort::Error),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),

    #[error("Model returned {got} class scores, expected {expected}")]
    LabelCountMismatch { expected: usize, got: usize },

    #[error("Model session lock poisoned")]
    SessionPoisoned,

    #[error("Model returned non-finite class scores")]
    NonFiniteScores,
}

/// Per-request failure while turning an uploaded document into text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Invalid PDF document: {0}")]
    Pdf(String),

    #[error("Invalid DOCX document: {0}")]
    Docx(String),

    #[error("Document contains no text")]
    Empty,
}

/// Everything a handler can fail with. Mapped to a status code in one place.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("Unsupported File Format. Upload .docx or .pdf")]
    UnsupportedFormat,

    #[error("No file uploaded")]
    MissingFile,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Expected a multipart/form-data body: {0}")]
    InvalidForm(String),

    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UnsupportedFormat
            | ApiError::MissingFile
            | ApiError::InvalidInput(_)
            | ApiError::InvalidForm(_)
            | ApiError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Multipart(e) => e.status(),
            ApiError::Inference(InferenceError::EmptyInput) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `detail` field of the response body.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Extraction(ExtractionError::Empty) => {
                "Could not extract text from file".to_string()
            }
            ApiError::Extraction(e) => format!("Could not extract text from file: {}", e),
            ApiError::Inference(InferenceError::EmptyInput) => self.to_string(),
            ApiError::Inference(e) => format!("Internal server error: {}", e),
            ApiError::Internal(msg) => format!("Internal server error: {}", msg),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", detail);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", detail);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_model_not_found_error() {
        let error = ModelLoadError::ModelNotFound(PathBuf::from("artifacts/model.onnx"));
        assert_eq!(
            error.to_string(),
            "Model not found at path: artifacts/model.onnx"
        );
    }

    #[test]
    fn test_label_count_mismatch_error() {
        let error = InferenceError::LabelCountMismatch {
            expected: 2,
            got: 3,
        };
        assert_eq!(
            error.to_string(),
            "Model returned 3 class scores, expected 2"
        );
    }

    #[test]
    fn test_shape_error_conversion() {
        let shape_error = ShapeError::from_kind(ndarray::ErrorKind::OutOfBounds);
        match InferenceError::from(shape_error) {
            InferenceError::ShapeError(_) => {}
            other => panic!("Expected ShapeError, got {:?}", other),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::ModelUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::UnsupportedFormat.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ExtractionError::Empty).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ExtractionError::Pdf("bad xref".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(InferenceError::EmptyInput).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(InferenceError::SessionPoisoned).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_non_finite_scores_are_server_errors() {
        let error = ApiError::from(InferenceError::NonFiniteScores);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error.detail(),
            "Internal server error: Model returned non-finite class scores"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_form() {
        let response = ApiError::InvalidForm("missing boundary".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(
            body["detail"],
            "Expected a multipart/form-data body: missing boundary"
        );
    }

    #[test]
    fn test_internal_errors_surface_message() {
        let error = ApiError::from(InferenceError::Tokenization("bad input".into()));
        assert_eq!(
            error.detail(),
            "Internal server error: Tokenization error: bad input"
        );
    }

    #[tokio::test]
    async fn test_into_response_unsupported_format() {
        let response = ApiError::UnsupportedFormat.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(
            body["detail"],
            "Unsupported File Format. Upload .docx or .pdf"
        );
    }

    #[tokio::test]
    async fn test_into_response_empty_extraction() {
        let response = ApiError::from(ExtractionError::Empty).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "Could not extract text from file");
    }

    #[tokio::test]
    async fn test_into_response_model_unavailable() {
        let response = ApiError::ModelUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "Model not loaded");
    }
}
