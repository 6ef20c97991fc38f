// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed

use crate::api::ApiError;
use crate::embeddings::PASSAGE_PREFIX;
use serde::{Deserialize, Serialize};

/// Request body for POST /embed
///
/// Exactly one of `text` / `texts` is expected; if both are present `text`
/// wins.
///
/// # Example
/// ```json
/// {
///   "texts": ["Hello world", "Another text"],
///   "prefix": "passage"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<String>>,

    /// Role label for prefix-mode models. Free-form; "query" and "passage"
    /// are the conventional values.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    PASSAGE_PREFIX.to_string()
}

impl EmbedRequest {
    /// Resolves the batch to embed
    ///
    /// # Validation Rules
    /// 1. `text` or `texts` must be present
    /// 2. `texts` must contain between 1 and `max_batch_size` items
    pub fn into_texts(self, max_batch_size: usize) -> Result<Vec<String>, ApiError> {
        let texts = match (self.text, self.texts) {
            (Some(text), _) => vec![text],
            (None, Some(texts)) => texts,
            (None, None) => {
                return Err(ApiError::ValidationError {
                    field: "text".to_string(),
                    message: "Missing 'text' or 'texts' in request body".to_string(),
                })
            }
        };

        if texts.is_empty() {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: "texts array must contain at least 1 item".to_string(),
            });
        }

        if texts.len() > max_batch_size {
            return Err(ApiError::ValidationError {
                field: "texts".to_string(),
                message: format!(
                    "texts array cannot contain more than {} items (got {})",
                    max_batch_size,
                    texts.len()
                ),
            });
        }

        Ok(texts)
    }
}
