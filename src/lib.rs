pub mod config;
pub mod error;
pub mod model;
pub mod preprocessing;
pub mod server;
pub mod telemetry;


// Re-export common types
pub use error::{ApiError, ConfigError, ExtractionError, InferenceError, ModelLoadError};
pub use model::pipeline::{PredictionPipeline, PredictionResult};
