use std::sync::Arc;

use crate::config::Settings;
use crate::services::backend::TextCompletion;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub backend: Arc<dyn TextCompletion>,
    pub prompt_field: String,
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl AppState {
    pub fn new(backend: Arc<dyn TextCompletion>) -> Self {
        Self {
            backend,
            prompt_field: "prompt".to_string(),
            max_tokens: Some(1000),
            temperature: 0.7,
        }
    }

    pub fn from_settings(backend: Arc<dyn TextCompletion>, settings: &Settings) -> Self {
        Self {
            backend,
            prompt_field: settings.prompt_field.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}
