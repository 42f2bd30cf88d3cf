use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(rename = "ModelConfig")]
    pub model: ModelConfiguration,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// When false, a model that fails to load leaves the server running
    /// and prediction endpoints answer "Model not loaded".
    pub require_model: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 20 * 1024 * 1024,
            require_model: true,
        }
    }
}

/// Where the classifier artifacts live and how they are used.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfiguration {
    pub root_dir: PathBuf,
    pub tokenizer_path: PathBuf,
    pub model_path: PathBuf,
    /// Output index to label, in model order.
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

fn default_labels() -> Vec<String> {
    vec!["Fake".to_string(), "true".to_string()]
}

fn default_max_length() -> usize {
    256
}

fn default_intra_threads() -> usize {
    4
}

impl AppConfig {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.model.validate()?;
        Ok(config)
    }
}

impl ModelConfiguration {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.labels.is_empty() {
            return Err(ConfigError::Invalid("labels must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for label in &self.labels {
            if !seen.insert(label.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate label '{}'", label)));
            }
        }
        if self.max_length == 0 {
            return Err(ConfigError::Invalid("max_length must be positive".into()));
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::Invalid("intra_threads must be positive".into()));
        }
        Ok(())
    }
}

/// Reads and validates the whole settings file, creating `root_dir` if needed.
pub fn load_app_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = AppConfig::from_yaml(&content, path)?;

    create_directories(&[&config.model.root_dir])?;
    tracing::debug!(path = %path.display(), "configuration loaded");

    Ok(config)
}

pub fn load_model_configuration(
    path: impl AsRef<Path>,
) -> Result<ModelConfiguration, ConfigError> {
    load_app_config(path).map(|config| config.model)
}

fn create_directories(dirs: &[&Path]) -> Result<(), ConfigError> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
