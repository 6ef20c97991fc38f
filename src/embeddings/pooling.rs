// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Mean pooling and L2 normalization
//!
//! These two steps define the embedding space, so they follow the
//! sentence-transformers reference exactly:
//! 1. Broadcast the attention mask over the hidden dimension, multiply, sum over
//!    the sequence axis and divide by the clamped token count.
//! 2. Divide each pooled row by its clamped Euclidean norm.
//!
//! Both clamps use [`EPSILON`], so all-padding rows and zero vectors come out
//! as zeros rather than NaN.

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use super::errors::{EmbeddingError, Result};

/// Lower bound for the token count and the vector norm
pub const EPSILON: f32 = 1e-9;

/// One output vector per input text
pub type EmbeddingVector = Vec<f32>;

/// Mean of the unmasked token vectors of each row: `[batch, seq, hidden] -> [batch, hidden]`
pub fn mean_pool(hidden: ArrayView3<'_, f32>, attention_mask: ArrayView2<'_, i64>) -> Result<Array2<f32>> {
    let (rows, seq_len, _) = hidden.dim();
    if attention_mask.dim() != (rows, seq_len) {
        return Err(EmbeddingError::ShapeMismatch {
            expected: format!("attention mask [{}, {}]", rows, seq_len),
            actual: format!("{:?}", attention_mask.shape()),
        });
    }

    let mask = attention_mask.mapv(|m| m as f32).insert_axis(Axis(2)); // [batch, seq, 1]
    let summed = (&hidden * &mask).sum_axis(Axis(1)); // [batch, hidden]
    let counts = mask.sum_axis(Axis(1)).mapv(|c| c.max(EPSILON)); // [batch, 1]

    Ok(summed / &counts)
}

/// Rescales every row to unit length in place
pub fn l2_normalize(mut pooled: Array2<f32>) -> Array2<f32> {
    for mut row in pooled.rows_mut() {
        let norm = row.dot(&row).sqrt().max(EPSILON);
        row.mapv_inplace(|v| v / norm);
    }
    pooled
}

/// Mean pooling followed by L2 normalization, rows kept in batch order
pub fn pool_and_normalize(
    hidden: ArrayView3<'_, f32>,
    attention_mask: ArrayView2<'_, i64>,
) -> Result<Vec<EmbeddingVector>> {
    let pooled = mean_pool(hidden, attention_mask)?;
    Ok(l2_normalize(pooled)
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect())
}

/// Dot product of two unit vectors, i.e. their cosine similarity
pub fn dot(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::ShapeMismatch {
            expected: format!("vector of length {}", a.len()),
            actual: format!("vector of length {}", b.len()),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}
