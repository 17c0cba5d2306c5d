use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model_name: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// Generated text plus the daemon's performance counters, passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_name: String,
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}

// Wire shapes of the daemon API.

#[derive(Debug, Serialize)]
pub(crate) struct UpstreamGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: UpstreamOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpstreamOptions {
    pub num_predict: u32,
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamGenerateResponse {
    #[serde(default)]
    pub response: String,
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

impl UpstreamGenerateResponse {
    pub fn into_result(self, model_name: String) -> GenerationResult {
        GenerationResult {
            text: self.response,
            model_name,
            total_duration: self.total_duration,
            load_duration: self.load_duration,
            prompt_eval_count: self.prompt_eval_count,
            prompt_eval_duration: self.prompt_eval_duration,
            eval_count: self.eval_count,
            eval_duration: self.eval_duration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamTags {
    #[serde(default)]
    pub models: Vec<UpstreamModel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamModel {
    pub name: String,
}
