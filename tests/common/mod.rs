#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chat_relay::{
    routes::{cors_layer, create_router},
    services::backend::{BackendError, TextCompletion},
    state::AppState,
};
use tower::util::ServiceExt;

/// Replies with the prompt it was given and counts calls.
#[derive(Default)]
pub struct EchoBackend {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TextCompletion for EchoBackend {
    async fn generate(
        &self,
        prompt: &str,
        _max_output_len: Option<u32>,
        _temperature: f32,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("echo: {prompt}"))
    }
}

/// Fails the first call, then behaves like [`EchoBackend`].
#[derive(Default)]
pub struct FlakyBackend {
    pub failed_once: AtomicBool,
}

#[async_trait]
impl TextCompletion for FlakyBackend {
    async fn generate(
        &self,
        prompt: &str,
        _max_output_len: Option<u32>,
        _temperature: f32,
    ) -> Result<String, BackendError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Inference("simulated outage".to_string()));
        }
        Ok(format!("echo: {prompt}"))
    }
}

pub fn app_with(backend: Arc<dyn TextCompletion>, static_dir: &std::path::Path) -> Router {
    let state = Arc::new(AppState::new(backend));
    create_router(static_dir).with_state(state)
}

pub fn app_with_cors(origins: &[String], static_dir: &std::path::Path) -> Router {
    app_with(Arc::new(EchoBackend::default()), static_dir).layer(cors_layer(origins))
}

pub fn preflight_request(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/chat")
        .header("origin", origin)
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap()
}

pub fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
