use axum::{Json, body::Bytes, extract::State};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse},
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request = ChatRequest::from_body(&body, &state.prompt_field)?;

    tracing::info!(prompt_chars = request.prompt.chars().count(), "chat request");

    let reply = state
        .backend
        .generate(&request.prompt, state.max_tokens, state.temperature)
        .await?;

    tracing::info!(reply_chars = reply.chars().count(), "chat reply");

    Ok(Json(ChatResponse { response: reply }))
}
