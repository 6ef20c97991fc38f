// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /similarity HTTP handler

use crate::api::http_server::AppState;
use crate::api::similarity::{SimilarityRequest, SimilarityResponse};
use crate::api::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

pub async fn similarity_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimilarityRequest>, JsonRejection>,
) -> Result<Json<SimilarityResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let (text1, text2) = request.into_pair()?;

    let pipeline = state.pipeline.clone();
    let (similarity, text1, text2) = tokio::task::spawn_blocking(move || {
        pipeline
            .similarity(&text1, &text2)
            .map(|score| (score, text1, text2))
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("similarity task failed: {}", e)))??;

    Ok(Json(SimilarityResponse {
        similarity,
        text1,
        text2,
    }))
}
