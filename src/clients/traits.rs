use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoding parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("model API key is not configured")]
    MissingApiKey,
    #[error("model API returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("model returned no text (finish reason: {})", .0.as_deref().unwrap_or("unknown"))]
    EmptyResponse(Option<String>),
}

/// A hosted text-generation model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams)
    -> Result<String, GeneratorError>;

    /// Model identifier, for logs
    fn model(&self) -> &str;
}
