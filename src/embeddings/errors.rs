// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Error taxonomy for the embedding engine.
//!
//! Callers branch on [`ErrorKind`] rather than on message text:
//! - `Validation`: the caller sent something unusable (empty batch, too many texts)
//! - `Inference`: the runtime or tokenizer failed on this request only
//! - `Startup`: the model cannot be materialised, loaded, or no longer
//!   matches the tokenizer it was loaded with

use thiserror::Error;

/// Coarse classification of an [`EmbeddingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Inference,
    Startup,
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("{0}")]
    Validation(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("startup failed: {0}")]
    Startup(String),

    /// Tensor shapes disagree with the model signature. Indicates tokenizer /
    /// model skew, which is a configuration fault rather than a bad request.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

impl EmbeddingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingError::Validation(_) => ErrorKind::Validation,
            EmbeddingError::Inference(_) => ErrorKind::Inference,
            EmbeddingError::Startup(_) | EmbeddingError::ShapeMismatch { .. } => {
                ErrorKind::Startup
            }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EmbeddingError::Validation(message.into())
    }

    pub fn inference(message: impl std::fmt::Display) -> Self {
        EmbeddingError::Inference(message.to_string())
    }

    pub fn startup(message: impl std::fmt::Display) -> Self {
        EmbeddingError::Startup(message.to_string())
    }
}

impl From<ort::Error> for EmbeddingError {
    fn from(err: ort::Error) -> Self {
        EmbeddingError::Inference(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;
