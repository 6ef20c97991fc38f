// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding pipeline
//!
//! Composes tokenizer → inference engine → pooling into `embed` and
//! `similarity`. All model state lives in an immutable [`EmbeddingContext`]
//! built once at startup; the pipeline itself keeps no per-request state, so
//! any number of request threads may call it concurrently.

use std::sync::Arc;
use tracing::{debug, info};

use super::errors::{EmbeddingError, Result};
use super::model_id::{ModelIdentifier, PrefixMode};
use super::onnx_model::InferenceEngine;
use super::pooling::{dot, pool_and_normalize, EmbeddingVector};
use super::tokenizer::TokenizerAdapter;

/// Role prefix used for documents and as the `/embed` default
pub const PASSAGE_PREFIX: &str = "passage";

/// Role prefix used for the first text of `/similarity`
pub const QUERY_PREFIX: &str = "query";

const PROBE_TEXT: &str = "dimension probe";

/// Process-wide, read-only model state
pub struct EmbeddingContext {
    model_id: ModelIdentifier,
    tokenizer: TokenizerAdapter,
    engine: Box<dyn InferenceEngine>,
    dimension: usize,
}

impl std::fmt::Debug for EmbeddingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingContext")
            .field("model_id", &self.model_id)
            .field("prefix_mode", &self.prefix_mode())
            .field("runtime", &self.engine.runtime_name())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl EmbeddingContext {
    /// Wires a tokenizer to an engine and discovers the hidden size.
    ///
    /// One probe inference runs here so that a tokenizer the model cannot
    /// consume fails at startup rather than on the first request.
    pub fn new(
        model_id: ModelIdentifier,
        tokenizer: TokenizerAdapter,
        engine: Box<dyn InferenceEngine>,
    ) -> Result<Self> {
        let probe = tokenizer
            .encode(&[PROBE_TEXT.to_string()], PASSAGE_PREFIX)
            .map_err(|e| EmbeddingError::startup(format!("Tokenizer validation failed: {}", e)))?;
        let hidden = engine
            .infer(&probe)
            .map_err(|e| EmbeddingError::startup(format!("Model validation failed: {}", e)))?;

        let dimension = hidden.dim().2;
        if dimension == 0 {
            return Err(EmbeddingError::startup(format!(
                "Model {} produced an empty hidden dimension",
                model_id
            )));
        }

        info!(
            model = %model_id,
            runtime = engine.runtime_name(),
            prefix_mode = ?tokenizer.prefix_mode(),
            dimension,
            "Embedding context ready"
        );

        Ok(Self {
            model_id,
            tokenizer,
            engine,
            dimension,
        })
    }

    pub fn model_id(&self) -> &ModelIdentifier {
        &self.model_id
    }

    pub fn prefix_mode(&self) -> PrefixMode {
        self.tokenizer.prefix_mode()
    }

    pub fn runtime_name(&self) -> &'static str {
        self.engine.runtime_name()
    }

    /// Hidden size of the loaded model; constant for the process lifetime
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Unit-norm vectors for one `embed` call
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    pub vectors: Vec<EmbeddingVector>,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct EmbeddingPipeline {
    context: Arc<EmbeddingContext>,
}

impl EmbeddingPipeline {
    pub fn new(context: Arc<EmbeddingContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &EmbeddingContext {
        &self.context
    }

    /// Embeds `texts` in one batch, in input order
    ///
    /// `prefix` is the role label applied when the model uses prefix mode.
    pub fn embed(&self, texts: &[String], prefix: &str) -> Result<Embeddings> {
        if texts.is_empty() {
            return Err(EmbeddingError::validation(
                "texts must contain at least 1 item",
            ));
        }

        let batch = self.context.tokenizer.encode(texts, prefix)?;
        let hidden = self.context.engine.infer(&batch)?;

        let (rows, width, hidden_dim) = hidden.dim();
        if rows != batch.rows() || width != batch.width() || hidden_dim != self.context.dimension {
            return Err(EmbeddingError::ShapeMismatch {
                expected: format!(
                    "[{}, {}, {}]",
                    batch.rows(),
                    batch.width(),
                    self.context.dimension
                ),
                actual: format!("{:?}", hidden.shape()),
            });
        }

        let vectors = pool_and_normalize(hidden.view(), batch.attention_mask.view())?;
        debug!(count = vectors.len(), width, prefix, "embedded batch");

        Ok(Embeddings {
            vectors,
            dimension: self.context.dimension,
        })
    }

    /// Cosine similarity of `text1` embedded as a query and `text2` as a passage
    ///
    /// The two roles differ, so with prefix mode on the score is not symmetric.
    pub fn similarity(&self, text1: &str, text2: &str) -> Result<f32> {
        let query = self.embed_one(text1, QUERY_PREFIX)?;
        let passage = self.embed_one(text2, PASSAGE_PREFIX)?;
        dot(&query, &passage)
    }

    fn embed_one(&self, text: &str, prefix: &str) -> Result<EmbeddingVector> {
        let mut embeddings = self.embed(&[text.to_string()], prefix)?;
        embeddings
            .vectors
            .pop()
            .ok_or_else(|| EmbeddingError::inference("pipeline returned no vector"))
    }
}
