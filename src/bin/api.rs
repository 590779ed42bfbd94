use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transformation_crew::{
    api::{start_server, ApiState},
    config::PipelineConfig,
    crew::Crew,
    generation::GeminiClient,
    store::InMemoryReportStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env and environment variables
    let config = PipelineConfig::from_env()?;

    info!("Transformation Crew - API Server");
    info!(
        port = config.port,
        model = %config.gemini_model,
        handoff = ?config.crew.handoff,
        timeout_secs = config.timeout.as_secs(),
        "Configuration loaded"
    );

    let generator = GeminiClient::new(
        config.require_api_key()?.to_string(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    )?;

    let state = ApiState {
        crew: Arc::new(Crew::from_generator(Arc::new(generator), &config.crew)),
        store: Arc::new(InMemoryReportStore::new()),
        deadline: config.timeout,
    };

    info!("Crew initialized, starting API server");

    start_server(state, config.port).await?;

    Ok(())
}
