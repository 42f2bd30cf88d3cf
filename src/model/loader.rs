use crate::error::ModelLoadError;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::{Path, PathBuf};

/// File looked up when `model_path` names a directory.
pub const MODEL_FILE: &str = "model.onnx";
/// File looked up when `tokenizer_path` names a directory.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

// Initialize the global environment for ORT (only needed once)
pub fn init_ort() -> Result<(), ModelLoadError> {
    ort::init().with_name("newscheck").commit()?;
    Ok(())
}

/// Resolves a configured artifact path: a directory is joined with
/// `default_file`, anything else is used as-is.
pub fn resolve_artifact(path: &Path, default_file: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_file)
    } else {
        path.to_path_buf()
    }
}

/// Directory holding the model weights and its `config.json`.
pub fn model_dir(model_path: &Path) -> PathBuf {
    if model_path.is_dir() {
        model_path.to_path_buf()
    } else {
        model_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Loads an ONNX model from disk and creates an inference session.
///
/// # Arguments
/// * `model_path` - Path to the .onnx file
/// * `intra_threads` - Parallelism within an op
pub fn load_session(
    model_path: impl AsRef<Path>,
    intra_threads: usize,
) -> Result<Session, ModelLoadError> {
    let path = model_path.as_ref();
    if !path.is_file() {
        return Err(ModelLoadError::ModelNotFound(path.to_path_buf()));
    }

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)?;

    tracing::info!(path = %path.display(), "loaded model");
    for (i, input) in session.inputs.iter().enumerate() {
        tracing::debug!(index = i, name = %input.name, "model input");
    }

    Ok(session)
}
