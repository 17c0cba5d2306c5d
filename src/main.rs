use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ollama_gateway::{AppConfig, OllamaClient, TargetStore, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        api_base = %config.ollama_api_base,
        max_tokens = config.default_max_tokens,
        temperature = config.default_temperature,
        timeout = ?config.request_timeout,
        store = ?config.config_path,
        "starting gateway"
    );

    let targets = Arc::new(TargetStore::initialize(config.as_ref())?);
    let client = Arc::new(OllamaClient::new(config.clone(), targets));
    let router = build_router(client);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready; make sure Ollama is running (ollama serve)");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
