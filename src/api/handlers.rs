// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::api::http_server::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub runtime: String,
    pub e5_prefix_mode: bool,
}

/// GET /health; the router only exists once the model is loaded, so this is always healthy
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let context = state.pipeline.context();
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: context.model_id().to_string(),
        runtime: context.runtime_name().to_string(),
        e5_prefix_mode: context.prefix_mode().is_enabled(),
    })
}
