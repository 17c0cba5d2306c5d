pub mod config;
pub mod error;
pub mod ollama;
pub mod server;
pub mod target;

pub use config::AppConfig;
pub use error::GatewayError;
pub use ollama::{GenerationRequest, GenerationResult, OllamaClient};
pub use server::build_router;
pub use target::{OllamaTarget, TargetStore};
