use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Older frontends post the prompt under this key.
pub const LEGACY_PROMPT_FIELD: &str = "message";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub prompt: String,
}

impl ChatRequest {
    /// Pull the prompt out of a raw JSON body, looking at `field` first and
    /// falling back to the legacy `message` key.
    pub fn from_body(body: &[u8], field: &str) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| AppError::InvalidRequest("Request body must be JSON".to_string()))?;

        let Value::Object(map) = value else {
            return Err(AppError::InvalidRequest(
                "Request body must be a JSON object".to_string(),
            ));
        };

        let prompt = map
            .get(field)
            .or_else(|| map.get(LEGACY_PROMPT_FIELD))
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| AppError::InvalidRequest(format!("Missing {field}")))?;

        Ok(Self {
            prompt: prompt.to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
