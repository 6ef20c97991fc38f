// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request and response types for POST /similarity

use crate::api::ApiError;
use serde::{Deserialize, Serialize};

/// Request body for POST /similarity
///
/// `text1` is embedded as a query and `text2` as a passage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarityRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text2: Option<String>,
}

impl SimilarityRequest {
    pub fn into_pair(self) -> Result<(String, String), ApiError> {
        match (self.text1, self.text2) {
            (Some(text1), Some(text2)) => Ok((text1, text2)),
            (text1, _) => Err(ApiError::ValidationError {
                field: if text1.is_none() { "text1" } else { "text2" }.to_string(),
                message: "Missing 'text1' or 'text2' in request body".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub similarity: f32,
    pub text1: String,
    pub text2: String,
}
