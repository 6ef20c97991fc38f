// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use crate::embeddings::Embeddings;
use serde::{Deserialize, Serialize};

/// Response body for POST /embed
///
/// # Example
/// ```json
/// {
///   "embeddings": [[0.01, -0.04, ...]],
///   "dimension": 384,
///   "count": 1
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Unit-norm vectors, one per input text, in input order
    pub embeddings: Vec<Vec<f32>>,

    /// Length of every vector (the model's hidden size)
    pub dimension: usize,

    pub count: usize,
}

impl From<Embeddings> for EmbedResponse {
    fn from(result: Embeddings) -> Self {
        EmbedResponse {
            count: result.vectors.len(),
            dimension: result.dimension,
            embeddings: result.vectors,
        }
    }
}
