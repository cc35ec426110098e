use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{BackendKind, ConfigError, Settings};
use crate::services::local_model::{LocalModel, LocalModelBackend};
use crate::services::openai::OpenAiBackend;

/// Anything that can continue a prompt with generated text.
///
/// Implementations are shared across request tasks, so they must be
/// `Send + Sync` and must not hold request-scoped state.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Generate a reply to `prompt`. `max_output_len` of `None` leaves the
    /// length up to the backend.
    async fn generate(
        &self,
        prompt: &str,
        max_output_len: Option<u32>,
        temperature: f32,
    ) -> Result<String, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request to model provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model provider returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed response from model provider: {0}")]
    MalformedResponse(String),

    #[error("model provider returned no completion")]
    EmptyCompletion,

    #[error("local inference failed: {0}")]
    Inference(String),
}

/// Construct the backend selected by `settings`.
pub fn build_backend(settings: &Settings) -> Result<Arc<dyn TextCompletion>, ConfigError> {
    match settings.backend {
        BackendKind::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
            let backend = OpenAiBackend::new(
                api_key,
                settings.openai_base_url.clone(),
                settings.openai_model.clone(),
            )?;
            Ok(Arc::new(backend))
        }
        BackendKind::Local => {
            let model = LocalModel::load(&settings.local_model_path).map_err(|source| {
                ConfigError::Checkpoint {
                    path: settings.local_model_path.clone(),
                    source,
                }
            })?;
            Ok(Arc::new(LocalModelBackend::new(model)))
        }
    }
}
