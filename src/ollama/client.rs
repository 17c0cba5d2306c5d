use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use crate::{
    config::AppConfig,
    error::{GatewayError, truncate_body},
    ollama::types::{
        GenerationRequest, GenerationResult, UpstreamGenerateRequest, UpstreamGenerateResponse,
        UpstreamOptions, UpstreamTags,
    },
    target::TargetStore,
};

const LOG_BODY_LIMIT: usize = 512;

/// Forwards gateway calls to the daemon currently selected in the [`TargetStore`].
pub struct OllamaClient {
    http: reqwest::Client,
    config: Arc<AppConfig>,
    targets: Arc<TargetStore>,
}

impl OllamaClient {
    pub fn new(config: Arc<AppConfig>, targets: Arc<TargetStore>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            targets,
        }
    }

    pub fn targets(&self) -> &Arc<TargetStore> {
        &self.targets
    }

    pub async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let url = self.targets.current().endpoint("/api/tags");
        debug!(%url, "listing models");

        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|err| transport_failure(err, &url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_failure(err, &url))?;

        if status != StatusCode::OK {
            error!(
                %url,
                status = status.as_u16(),
                body = truncate_body(&body, LOG_BODY_LIMIT),
                "model listing rejected by ollama"
            );
            return Err(GatewayError::ModelListing(format!("status {}", status.as_u16())));
        }

        let tags: UpstreamTags = serde_json::from_str(&body).map_err(|err| {
            error!(
                %url,
                %err,
                body = truncate_body(&body, LOG_BODY_LIMIT),
                "malformed model listing"
            );
            GatewayError::ModelListing(err.to_string())
        })?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Validates the model against the daemon's listing, then runs a single
    /// non-streaming generation.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let config = self.config.as_ref();
        let available = self.list_models().await?;
        if available.is_empty() {
            warn!("generation requested but ollama has no models installed");
            return Err(GatewayError::NoModels);
        }
        if !available.iter().any(|m| *m == request.model_name) {
            warn!(model = %request.model_name, ?available, "unknown model requested");
            return Err(GatewayError::ModelNotFound {
                model: request.model_name,
                available,
            });
        }

        let payload = UpstreamGenerateRequest {
            model: &request.model_name,
            prompt: &request.prompt,
            stream: false,
            options: UpstreamOptions {
                num_predict: request.max_tokens.unwrap_or(config.default_max_tokens),
                temperature: request.temperature.unwrap_or(config.default_temperature),
            },
        };

        let url = self.targets.current().endpoint("/api/generate");
        info!(
            %url,
            model = %request.model_name,
            num_predict = payload.options.num_predict,
            temperature = payload.options.temperature,
            "forwarding generation"
        );

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .timeout(config.request_timeout)
            .send()
            .await
            .map_err(|err| transport_failure(err, &url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| transport_failure(err, &url))?;

        if status != StatusCode::OK {
            let body = truncate_body(&body, LOG_BODY_LIMIT).to_string();
            error!(%url, status = status.as_u16(), %body, "generation rejected by ollama");
            return Err(GatewayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let upstream: UpstreamGenerateResponse = serde_json::from_str(&body).map_err(|err| {
            error!(
                %url,
                %err,
                body = truncate_body(&body, LOG_BODY_LIMIT),
                "malformed generation response"
            );
            GatewayError::InvalidResponse(err.to_string())
        })?;

        let result = upstream.into_result(request.model_name);
        debug!(
            model = %result.model_name,
            eval_count = ?result.eval_count,
            total_duration = ?result.total_duration,
            "generation complete"
        );
        Ok(result)
    }
}

fn transport_failure(err: reqwest::Error, url: &str) -> GatewayError {
    error!(%url, %err, "ollama request failed");
    GatewayError::from_transport(err, url)
}
