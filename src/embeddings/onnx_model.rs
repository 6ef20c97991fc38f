// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX inference engine
//!
//! Wraps an ONNX Runtime session loaded once from the artifact cache and held
//! for the process lifetime. The engine performs no numerical work of its
//! own: token tensors in, last hidden state `[batch, seq_len, hidden_dim]` out.
//!
//! Features:
//! - CPU execution by default, optional CUDA with automatic CPU fallback
//! - `token_type_ids` supplied as zeros when the exported graph declares it
//! - Output shape checked against the input batch on every call

use anyhow::Context;
use ndarray::{Array2, Array3, Ix3};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

use super::errors::{EmbeddingError, Result};
use super::tokenizer::TokenBatch;

/// Runtime name reported by `/health`
pub const ONNX_RUNTIME_NAME: &str = "onnx";

/// Runs a transformer encoder over a token batch
///
/// Implementations must be deterministic for identical inputs and safe to
/// call from several request threads at once (serialising internally if the
/// underlying runtime requires it).
pub trait InferenceEngine: Send + Sync {
    /// Returns the last hidden layer, shaped `[batch.rows(), batch.width(), hidden_dim]`
    fn infer(&self, batch: &TokenBatch) -> Result<Array3<f32>>;

    fn runtime_name(&self) -> &'static str;
}

/// Session construction options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub intra_threads: usize,
    pub use_cuda: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            use_cuda: false,
        }
    }
}

/// ONNX Runtime backed encoder
pub struct OnnxEmbeddingModel {
    /// `Session::run` needs `&mut`, so concurrent requests take turns
    session: Mutex<Session>,

    model_name: String,

    uses_token_type_ids: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Loads a native ONNX model from the artifact cache
    ///
    /// # Errors
    /// Returns `EmbeddingError::Startup` if the file is missing, cannot be
    /// parsed, or does not declare `input_ids` and `attention_mask` inputs.
    pub fn new<P: AsRef<Path>>(
        model_name: impl Into<String>,
        model_path: P,
        options: &SessionOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(EmbeddingError::startup(format!(
                "ONNX model file not found: {}",
                model_path.display()
            )));
        }

        let session = if options.use_cuda {
            info!("Attempting CUDA execution provider");
            match build_session(model_path, options, true) {
                Ok(session) => {
                    info!("CUDA execution provider initialized");
                    session
                }
                Err(e) => {
                    warn!("CUDA execution provider failed: {}", e);
                    warn!("Falling back to CPU execution provider");
                    build_session(model_path, options, false)
                        .map_err(|e| EmbeddingError::startup(format!("{:#}", e)))?
                }
            }
        } else {
            build_session(model_path, options, false)
                .map_err(|e| EmbeddingError::startup(format!("{:#}", e)))?
        };

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        for required in ["input_ids", "attention_mask"] {
            if !input_names.contains(&required) {
                return Err(EmbeddingError::startup(format!(
                    "Model {} does not declare required input '{}' (inputs: {:?})",
                    model_path.display(),
                    required,
                    input_names
                )));
            }
        }
        let uses_token_type_ids = input_names.contains(&"token_type_ids");

        info!(
            model = %model_name,
            path = %model_path.display(),
            token_type_ids = uses_token_type_ids,
            "ONNX embedding model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            model_name,
            uses_token_type_ids,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn build_session(
    model_path: &Path,
    options: &SessionOptions,
    cuda: bool,
) -> anyhow::Result<Session> {
    let builder = Session::builder().context("Failed to create session builder")?;
    let builder = if cuda {
        builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
    } else {
        builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
    };

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(options.intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load ONNX model from {}",
            model_path.display()
        ))
}

impl InferenceEngine for OnnxEmbeddingModel {
    fn infer(&self, batch: &TokenBatch) -> Result<Array3<f32>> {
        let (rows, width) = batch.input_ids.dim();
        if batch.attention_mask.dim() != (rows, width) {
            return Err(EmbeddingError::ShapeMismatch {
                expected: format!("attention_mask [{}, {}]", rows, width),
                actual: format!("{:?}", batch.attention_mask.shape()),
            });
        }

        let input_ids = Value::from_array(batch.input_ids.clone())?;
        let attention_mask = Value::from_array(batch.attention_mask.clone())?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::inference("ONNX session lock poisoned"))?;

        let outputs = if self.uses_token_type_ids {
            let token_type_ids = Value::from_array(Array2::<i64>::zeros((rows, width)))?;
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])?
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])?
        };

        // Index [0] rather than a name: exports differ on "last_hidden_state" vs "token_embeddings"
        let hidden = outputs[0].try_extract_array::<f32>()?;
        let output_shape = hidden.shape().to_vec();
        let hidden = hidden
            .into_dimensionality::<Ix3>()
            .map_err(|_| EmbeddingError::ShapeMismatch {
                expected: format!("[{}, {}, hidden_dim]", rows, width),
                actual: format!("{:?}", output_shape),
            })?;

        let (out_rows, out_width, _) = hidden.dim();
        if out_rows != rows || out_width != width {
            return Err(EmbeddingError::ShapeMismatch {
                expected: format!("[{}, {}, hidden_dim]", rows, width),
                actual: format!("{:?}", hidden.shape()),
            });
        }

        Ok(hidden.to_owned())
    }

    fn runtime_name(&self) -> &'static str {
        ONNX_RUNTIME_NAME
    }
}
