use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    error::GatewayError,
    ollama::{GenerationRequest, GenerationResult, ModelListResponse, OllamaClient},
    target::OllamaTarget,
};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<OllamaClient>,
}

#[derive(Debug, Default, Deserialize)]
struct TargetUpdate {
    #[serde(default)]
    custom_ollama_ip: Option<String>,
}

pub fn build_router(client: Arc<OllamaClient>) -> Router {
    let state = AppState { client };

    Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/generate", post(generate))
        .route("/config/ollama", get(get_target).post(set_target))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "ok"
}

async fn list_models(
    State(state): State<AppState>,
) -> Result<Json<ModelListResponse>, GatewayError> {
    let models = state.client.list_models().await?;
    Ok(Json(ModelListResponse { models }))
}

async fn generate(
    State(state): State<AppState>,
    request: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, GatewayError> {
    let Json(request) = request.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    let result = state.client.generate(request).await?;
    Ok(Json(result))
}

async fn get_target(State(state): State<AppState>) -> Json<OllamaTarget> {
    Json(state.client.targets().current().as_ref().clone())
}

async fn set_target(
    State(state): State<AppState>,
    update: Result<Json<TargetUpdate>, JsonRejection>,
) -> Result<Json<OllamaTarget>, GatewayError> {
    let Json(update) = update.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    info!(requested = ?update.custom_ollama_ip, "updating ollama target");
    let targets = state.client.targets().clone();
    let target = task::spawn_blocking(move || targets.set_custom_host(update.custom_ollama_ip))
        .await
        .map_err(|err| GatewayError::Store(format!("config update task failed: {err}")))??;
    Ok(Json(target.as_ref().clone()))
}
