use anyhow::Context;
use newscheck::config::{self, ModelConfiguration};
use newscheck::{model, server, telemetry, PredictionPipeline};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Init
    telemetry::init_tracing();
    let metrics = telemetry::install_metrics();

    // 2. Load Config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config = config::load_app_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    // 3. Initialize Model
    let pipeline = match load_pipeline(&config.model) {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) if !config.server.require_model => {
            tracing::error!("model not loaded, prediction endpoints disabled: {:#}", e);
            None
        }
        Err(e) => return Err(e),
    };

    // 4. Create Router
    let mut state = server::types::AppState::new(pipeline);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = server::routes::create_router(state, config.server.max_upload_bytes);

    // 5. Bind & Serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn load_pipeline(config: &ModelConfiguration) -> anyhow::Result<PredictionPipeline> {
    model::loader::init_ort()?;
    let pipeline = PredictionPipeline::new(config).context("loading prediction pipeline")?;
    Ok(pipeline)
}
