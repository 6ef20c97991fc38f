// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health tests

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use fabstir_embed_node::{
    api::{
        http_server::{create_app, AppState},
        HealthResponse,
    },
    embeddings::{
        mock::{word_level_tokenizer, MockInferenceEngine},
        EmbeddingContext, EmbeddingPipeline, ModelIdentifier, PrefixMode, TokenizerAdapter,
    },
};
use std::sync::Arc;
use tower::util::ServiceExt;

async fn get_health(model: &str) -> (StatusCode, HealthResponse) {
    let model = ModelIdentifier::new(model).unwrap();
    let adapter = TokenizerAdapter::new(
        word_level_tokenizer(&["hello"]).unwrap(),
        PrefixMode::detect(&model),
        512,
    )
    .unwrap();
    let context =
        EmbeddingContext::new(model, adapter, Box::new(MockInferenceEngine::new(4))).unwrap();
    let app = create_app(AppState::new(EmbeddingPipeline::new(Arc::new(context))));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_e5_model() {
        let (status, health) = get_health("intfloat/e5-small-v2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.model, "intfloat/e5-small-v2");
        assert_eq!(health.runtime, "mock");
        assert!(health.e5_prefix_mode);
    }

    #[tokio::test]
    async fn test_health_reports_prefix_mode_off() {
        let (status, health) = get_health("sentence-transformers/all-MiniLM-L6-v2").await;

        assert_eq!(status, StatusCode::OK);
        assert!(!health.e5_prefix_mode);
    }

    #[tokio::test]
    async fn test_health_allows_cross_origin() {
        let model = ModelIdentifier::new("intfloat/e5-small-v2").unwrap();
        let adapter = TokenizerAdapter::new(
            word_level_tokenizer(&[]).unwrap(),
            PrefixMode::E5,
            512,
        )
        .unwrap();
        let context =
            EmbeddingContext::new(model, adapter, Box::new(MockInferenceEngine::new(4))).unwrap();
        let app = create_app(AppState::new(EmbeddingPipeline::new(Arc::new(context))));

        let request = Request::builder()
            .method(Method::GET)
            .uri("/health")
            .header("origin", "http://example.test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
