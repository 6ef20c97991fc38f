// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tokenizer adapter
//!
//! Turns a batch of strings into a [`TokenBatch`]: token ids and attention
//! masks padded to the longest row of the batch (not a global length), with
//! each row truncated to the configured maximum sequence length.

use ndarray::Array2;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::errors::{EmbeddingError, Result};
use super::model_id::PrefixMode;

/// Maximum sequence length accepted by BERT-family encoders
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// Padded token ids and attention mask, both shaped `[rows, width]`
///
/// Row `i` corresponds to input text `i`. Mask entries are 1 for real tokens
/// and 0 for padding.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
}

impl TokenBatch {
    /// Builds a batch from unpadded rows, right-padding each to the longest.
    pub fn from_rows<I, M>(rows: &[(I, M)], pad_id: u32) -> Result<Self>
    where
        I: AsRef<[u32]>,
        M: AsRef<[u32]>,
    {
        if rows.is_empty() {
            return Err(EmbeddingError::validation(
                "texts must contain at least 1 item",
            ));
        }

        let max_len = rows
            .iter()
            .map(|(ids, _)| ids.as_ref().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = Vec::with_capacity(rows.len() * max_len);
        let mut attention_mask = Vec::with_capacity(rows.len() * max_len);

        for (ids, mask) in rows {
            let ids = ids.as_ref();
            let mask = mask.as_ref();
            if ids.len() != mask.len() {
                return Err(EmbeddingError::ShapeMismatch {
                    expected: format!("mask of length {}", ids.len()),
                    actual: format!("mask of length {}", mask.len()),
                });
            }

            input_ids.extend(ids.iter().map(|&id| i64::from(id)));
            attention_mask.extend(mask.iter().map(|&m| i64::from(m)));

            let padding_needed = max_len - ids.len();
            input_ids.extend(std::iter::repeat(i64::from(pad_id)).take(padding_needed));
            attention_mask.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        let shape = (rows.len(), max_len);
        let input_ids = Array2::from_shape_vec(shape, input_ids)
            .map_err(|e| EmbeddingError::inference(format!("input_ids array: {}", e)))?;
        let attention_mask = Array2::from_shape_vec(shape, attention_mask)
            .map_err(|e| EmbeddingError::inference(format!("attention_mask array: {}", e)))?;

        Ok(Self {
            input_ids,
            attention_mask,
        })
    }

    pub fn rows(&self) -> usize {
        self.input_ids.nrows()
    }

    /// Padded sequence length shared by every row
    pub fn width(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Wraps a HuggingFace tokenizer with the service's prefix and padding rules
pub struct TokenizerAdapter {
    tokenizer: Tokenizer,
    prefix_mode: PrefixMode,
    pad_id: u32,
    max_length: usize,
}

impl std::fmt::Debug for TokenizerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerAdapter")
            .field("prefix_mode", &self.prefix_mode)
            .field("pad_id", &self.pad_id)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl TokenizerAdapter {
    /// Loads `tokenizer.json` from disk
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        prefix_mode: PrefixMode,
        max_length: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            EmbeddingError::startup(format!(
                "Failed to load tokenizer from {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(tokenizer, prefix_mode, max_length)
    }

    /// Configures truncation at `max_length` and takes over padding.
    ///
    /// Any padding baked into the tokenizer config is disabled; its pad id is
    /// kept so padded rows use the model's own pad token.
    pub fn new(mut tokenizer: Tokenizer, prefix_mode: PrefixMode, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(EmbeddingError::startup("max sequence length must be greater than 0"));
        }

        let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::startup(format!("Failed to configure truncation: {}", e)))?;

        Ok(Self {
            tokenizer,
            prefix_mode,
            pad_id,
            max_length,
        })
    }

    pub fn prefix_mode(&self) -> PrefixMode {
        self.prefix_mode
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Texts as they are handed to the tokenizer
    pub fn prepare(&self, texts: &[String], prefix: &str) -> Vec<String> {
        texts
            .iter()
            .map(|text| self.prefix_mode.apply(text, prefix).into_owned())
            .collect()
    }

    pub fn encode(&self, texts: &[String], prefix: &str) -> Result<TokenBatch> {
        if texts.is_empty() {
            return Err(EmbeddingError::validation(
                "texts must contain at least 1 item",
            ));
        }

        let prepared = self.prepare(texts, prefix);
        let encodings = self
            .tokenizer
            .encode_batch(prepared, true)
            .map_err(|e| EmbeddingError::inference(format!("Tokenization failed: {}", e)))?;

        let rows: Vec<(&[u32], &[u32])> = encodings
            .iter()
            .map(|enc| (enc.get_ids(), enc.get_attention_mask()))
            .collect();
        let batch = TokenBatch::from_rows(&rows, self.pad_id)?;

        debug!(rows = batch.rows(), width = batch.width(), "encoded batch");
        Ok(batch)
    }
}
