// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding engine: artifact cache, tokenizer, ONNX inference, pooling and
//! the pipeline that composes them.

pub mod artifact_cache;
pub mod errors;
pub mod hub_exporter;
pub mod mock;
pub mod model_id;
pub mod onnx_model;
pub mod pipeline;
pub mod pooling;
pub mod tokenizer;

pub use artifact_cache::{ArtifactCache, ArtifactExporter, ArtifactPaths};
pub use errors::{EmbeddingError, ErrorKind};
pub use hub_exporter::HubOnnxExporter;
pub use model_id::{ModelIdentifier, PrefixMode, DEFAULT_MODEL};
pub use onnx_model::{InferenceEngine, OnnxEmbeddingModel, SessionOptions};
pub use pipeline::{EmbeddingContext, EmbeddingPipeline, Embeddings, PASSAGE_PREFIX, QUERY_PREFIX};
pub use pooling::{l2_normalize, mean_pool, pool_and_normalize, EmbeddingVector};
pub use tokenizer::{TokenBatch, TokenizerAdapter};
