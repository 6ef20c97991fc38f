// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::debug;

/// POST /embed handler
///
/// Validation happens before the pipeline is touched. Inference runs on the
/// blocking pool so a long batch does not stall other requests.
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let prefix = request.prefix.clone();
    let texts = request.into_texts(state.max_batch_size)?;

    debug!(count = texts.len(), prefix = %prefix, "embed request");

    let pipeline = state.pipeline.clone();
    let embeddings = tokio::task::spawn_blocking(move || pipeline.embed(&texts, &prefix))
        .await
        .map_err(|e| ApiError::InternalError(format!("embedding task failed: {}", e)))??;

    Ok(Json(embeddings.into()))
}
