// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service configuration
//!
//! Every option can be given as a flag or through its environment variable;
//! `.env` is loaded by `main` before parsing.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::embeddings::artifact_cache::DEFAULT_CACHE_ROOT;
use crate::embeddings::tokenizer::DEFAULT_MAX_LENGTH;
use crate::embeddings::{ModelIdentifier, PrefixMode, SessionOptions, DEFAULT_MODEL};

/// How the prefix convention is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrefixSetting {
    /// Derive from the model name (`e5` anywhere in the identifier)
    Auto,
    /// Always prepend `query: ` / `passage: `
    E5,
    /// Never prefix
    None,
}

impl PrefixSetting {
    pub fn resolve(self, model_id: &ModelIdentifier) -> PrefixMode {
        match self {
            PrefixSetting::Auto => PrefixMode::detect(model_id),
            PrefixSetting::E5 => PrefixMode::E5,
            PrefixSetting::None => PrefixMode::Disabled,
        }
    }
}

/// Fabstir embedding node
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-embed-node")]
#[command(about = "Text embedding and similarity service backed by ONNX Runtime", long_about = None)]
pub struct ServiceConfig {
    /// HuggingFace model identifier
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Model revision (branch, tag or commit) to export
    #[arg(long, env = "EMBEDDING_MODEL_REVISION")]
    pub revision: Option<String>,

    /// Root directory for materialised ONNX artifacts
    #[arg(long, env = "EMBEDDING_CACHE_DIR", default_value = DEFAULT_CACHE_ROOT)]
    pub cache_dir: PathBuf,

    /// Download cache for the HuggingFace Hub client (defaults to HF_HOME)
    #[arg(long, env = "EMBEDDING_HUB_CACHE_DIR")]
    pub hub_cache_dir: Option<PathBuf>,

    /// Role-prefix convention
    #[arg(long, env = "EMBEDDING_PREFIX_MODE", value_enum, default_value_t = PrefixSetting::Auto)]
    pub prefix_mode: PrefixSetting,

    #[arg(long, env = "EMBEDDING_LISTEN_ADDR", default_value = "0.0.0.0:5000")]
    pub listen_addr: SocketAddr,

    /// Tokens kept per text before truncation
    #[arg(long, env = "EMBEDDING_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Maximum texts accepted by one /embed request
    #[arg(long, env = "EMBEDDING_MAX_BATCH", default_value_t = crate::api::http_server::DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "EMBEDDING_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Try the CUDA execution provider first, falling back to CPU
    #[arg(long, env = "EMBEDDING_USE_CUDA", default_value_t = false)]
    pub use_cuda: bool,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model identifier cannot be empty"));
        }
        if self.max_length == 0 {
            return Err(anyhow!("max_length must be greater than 0"));
        }
        if self.max_batch_size == 0 {
            return Err(anyhow!("max_batch_size must be greater than 0"));
        }
        if self.intra_threads == 0 {
            return Err(anyhow!("intra_threads must be greater than 0"));
        }
        Ok(())
    }

    pub fn model_id(&self) -> Result<ModelIdentifier> {
        ModelIdentifier::new(self.model.clone()).map_err(|e| anyhow!(e))
    }

    pub fn prefix_mode_for(&self, model_id: &ModelIdentifier) -> PrefixMode {
        self.prefix_mode.resolve(model_id)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            intra_threads: self.intra_threads,
            use_cuda: self.use_cuda,
        }
    }
}
