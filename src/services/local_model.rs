//! Character-level generative model loaded from a local checkpoint.
//!
//! Tokens are raw ASCII codes. The checkpoint holds one row of next-code
//! scores per code; generation samples from the row of the previous code
//! until it emits code 0 or reaches the new-token limit.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use rand::{Rng, distributions::WeightedIndex, prelude::Distribution};
use serde::Deserialize;

use super::backend::{BackendError, TextCompletion};

pub const VOCAB_SIZE: usize = 128;

/// Code that ends generation.
const STOP_CODE: u8 = 0;
/// Seed code used when the prompt has no encodable characters.
const EMPTY_CONTEXT_SEED: u8 = b'\n';
/// Cap applied when the caller leaves the output length unbounded.
const DEFAULT_MAX_NEW_TOKENS: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid checkpoint json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid checkpoint shape: {0}")]
    Shape(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Checkpoint {
    pub vocab_size: usize,
    pub context_length: usize,
    pub logits: Vec<Vec<f32>>,
}

#[derive(Debug)]
pub struct LocalModel {
    context_length: usize,
    logits: Vec<Vec<f32>>,
}

impl LocalModel {
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let raw = std::fs::read_to_string(path)?;
        let checkpoint: Checkpoint = serde_json::from_str(&raw)?;
        Self::from_checkpoint(checkpoint)
    }

    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, CheckpointError> {
        if checkpoint.vocab_size != VOCAB_SIZE {
            return Err(CheckpointError::Shape(format!(
                "vocab_size must be {VOCAB_SIZE}, got {}",
                checkpoint.vocab_size
            )));
        }
        if checkpoint.context_length == 0 {
            return Err(CheckpointError::Shape("context_length must be positive".into()));
        }
        if checkpoint.logits.len() != VOCAB_SIZE {
            return Err(CheckpointError::Shape(format!(
                "expected {VOCAB_SIZE} logit rows, got {}",
                checkpoint.logits.len()
            )));
        }
        for (i, row) in checkpoint.logits.iter().enumerate() {
            if row.len() != VOCAB_SIZE {
                return Err(CheckpointError::Shape(format!(
                    "row {i} has {} entries, expected {VOCAB_SIZE}",
                    row.len()
                )));
            }
            if row.iter().any(|l| !l.is_finite()) {
                return Err(CheckpointError::Shape(format!("row {i} has non-finite logits")));
            }
        }

        Ok(Self {
            context_length: checkpoint.context_length,
            logits: checkpoint.logits,
        })
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn generate_codes<R: Rng + ?Sized>(
        &self,
        context: &[u8],
        max_new_tokens: usize,
        temperature: f32,
        rng: &mut R,
    ) -> Result<Vec<u8>, BackendError> {
        let mut last = context.last().copied().unwrap_or(EMPTY_CONTEXT_SEED);
        let mut out = Vec::new();

        for _ in 0..max_new_tokens {
            let next = sample(&self.logits[last as usize], temperature, rng)?;
            if next == STOP_CODE {
                break;
            }
            out.push(next);
            last = next;
        }

        Ok(out)
    }

    /// Encode, generate, decode.
    pub fn complete<R: Rng + ?Sized>(
        &self,
        prompt: &str,
        max_new_tokens: usize,
        temperature: f32,
        rng: &mut R,
    ) -> Result<String, BackendError> {
        let context = encode(prompt, self.context_length);
        let codes = self.generate_codes(&context, max_new_tokens, temperature, rng)?;
        Ok(decode(&codes))
    }
}

/// Map a prompt to ASCII codes, dropping anything outside the vocabulary and
/// keeping only the most recent `context_length` codes.
pub fn encode(prompt: &str, context_length: usize) -> Vec<u8> {
    let codes: Vec<u8> = prompt
        .chars()
        .filter_map(|c| u8::try_from(c).ok())
        .filter(|&c| (c as usize) < VOCAB_SIZE)
        .collect();
    let start = codes.len().saturating_sub(context_length);
    codes[start..].to_vec()
}

/// Inverse of [`encode`]; control codes other than newline and tab are dropped.
pub fn decode(codes: &[u8]) -> String {
    codes
        .iter()
        .copied()
        .filter(|&c| c == b'\n' || c == b'\t' || (0x20..0x7f).contains(&c))
        .map(char::from)
        .collect()
}

fn sample<R: Rng + ?Sized>(row: &[f32], temperature: f32, rng: &mut R) -> Result<u8, BackendError> {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if temperature <= 0.0 {
        let idx = row.iter().position(|&l| l == max).unwrap_or(0);
        return Ok(idx as u8);
    }

    let weights: Vec<f32> = row.iter().map(|&l| ((l - max) / temperature).exp()).collect();
    let dist = WeightedIndex::new(&weights).map_err(|e| BackendError::Inference(e.to_string()))?;
    Ok(dist.sample(rng) as u8)
}

/// [`TextCompletion`] over a [`LocalModel`]. Inference is CPU-bound, so it
/// runs on the blocking pool; the weights are shared read-only.
#[derive(Debug, Clone)]
pub struct LocalModelBackend {
    model: Arc<LocalModel>,
}

impl LocalModelBackend {
    pub fn new(model: LocalModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

#[async_trait]
impl TextCompletion for LocalModelBackend {
    async fn generate(
        &self,
        prompt: &str,
        max_output_len: Option<u32>,
        temperature: f32,
    ) -> Result<String, BackendError> {
        let model = Arc::clone(&self.model);
        let prompt = prompt.to_string();
        let max_new = max_output_len
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_MAX_NEW_TOKENS);

        tokio::task::spawn_blocking(move || {
            let mut rng = rand::thread_rng();
            model.complete(&prompt, max_new, temperature, &mut rng)
        })
        .await
        .map_err(|e| BackendError::Inference(e.to_string()))?
    }
}
