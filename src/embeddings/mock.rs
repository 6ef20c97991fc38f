// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic stand-ins for the tokenizer and inference runtime.
//!
//! Used by unit tests, integration tests and benchmarks so the pipeline can be
//! exercised without downloading a model.

use ndarray::Array3;
use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokenizers::Tokenizer;

use super::errors::{EmbeddingError, Result};
use super::onnx_model::InferenceEngine;
use super::tokenizer::TokenBatch;

pub const PAD_TOKEN_ID: u32 = 0;
pub const UNK_TOKEN_ID: u32 = 1;

/// Builds a lowercase, whitespace-split WordLevel tokenizer.
///
/// Ids: `[PAD]` = 0, `[UNK]` = 1, `query` = 2, `passage` = 3, `:` = 4, then
/// `words` in order starting at 5.
pub fn word_level_tokenizer(words: &[&str]) -> Result<Tokenizer> {
    let mut vocab = Map::new();
    let fixed = ["[PAD]", "[UNK]", "query", "passage", ":"];
    for (id, token) in fixed.iter().chain(words.iter()).enumerate() {
        let token = token.to_lowercase();
        if !vocab.contains_key(&token) {
            vocab.insert(token, Value::from(id as u64));
        }
    }

    let config = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    });

    Tokenizer::from_str(&config.to_string())
        .map_err(|e| EmbeddingError::startup(format!("fixture tokenizer: {}", e)))
}

/// Inference engine whose hidden state for a token depends only on its id.
///
/// Every position, padding included, gets `sin((id + 1) * (d + 1) * 0.37)` in
/// dimension `d`, so results are reproducible and independent of batching.
#[derive(Debug)]
pub struct MockInferenceEngine {
    hidden_size: usize,
    fail_on_token: Option<i64>,
    calls: AtomicUsize,
}

impl MockInferenceEngine {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            fail_on_token: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Any batch containing `token_id` fails with an inference error
    pub fn failing_on(mut self, token_id: u32) -> Self {
        self.fail_on_token = Some(i64::from(token_id));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn token_vector(&self, token_id: i64) -> Vec<f32> {
        (0..self.hidden_size)
            .map(|d| ((token_id + 1) as f32 * (d + 1) as f32 * 0.37).sin())
            .collect()
    }
}

impl InferenceEngine for MockInferenceEngine {
    fn infer(&self, batch: &TokenBatch) -> Result<Array3<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(bad) = self.fail_on_token {
            if batch.input_ids.iter().any(|&id| id == bad) {
                return Err(EmbeddingError::inference(format!(
                    "mock runtime rejected token {}",
                    bad
                )));
            }
        }

        let (rows, width) = batch.input_ids.dim();
        let mut hidden = Array3::<f32>::zeros((rows, width, self.hidden_size));
        for ((b, t), &id) in batch.input_ids.indexed_iter() {
            for (d, value) in self.token_vector(id).into_iter().enumerate() {
                hidden[[b, t, d]] = value;
            }
        }
        Ok(hidden)
    }

    fn runtime_name(&self) -> &'static str {
        "mock"
    }
}
