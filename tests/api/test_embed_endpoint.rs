// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed endpoint tests
//!
//! Requests go through the full router so extraction, validation, status
//! mapping and JSON error bodies are exercised together.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use fabstir_embed_node::{
    api::http_server::{create_app, AppState},
    embeddings::{
        mock::{word_level_tokenizer, MockInferenceEngine},
        EmbeddingContext, EmbeddingPipeline, ModelIdentifier, PrefixMode, TokenizerAdapter,
    },
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const HIDDEN: usize = 12;
// "poison" is the last fixture word; ids start at 5
const POISON_TOKEN_ID: u32 = 7;

fn setup_app(engine: MockInferenceEngine, max_batch_size: usize) -> Router {
    let tokenizer = word_level_tokenizer(&["hello", "world", "poison"]).unwrap();
    let adapter = TokenizerAdapter::new(tokenizer, PrefixMode::E5, 512).unwrap();
    let context = EmbeddingContext::new(
        ModelIdentifier::new("intfloat/e5-small-v2").unwrap(),
        adapter,
        Box::new(engine),
    )
    .unwrap();
    let pipeline = EmbeddingPipeline::new(Arc::new(context));
    create_app(AppState::new(pipeline).with_max_batch_size(max_batch_size))
}

async fn post_embed(app: Router, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/embed")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[cfg(test)]
mod embed_endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_text() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, json) = post_embed(app, r#"{"text": "hello world"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["dimension"], HIDDEN);

        let vectors = json["embeddings"].as_array().unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].as_array().unwrap().len(), HIDDEN);
    }

    #[tokio::test]
    async fn test_batch_returns_vectors_in_order() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, batch) =
            post_embed(app.clone(), r#"{"texts": ["hello", "world", "hello world"]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch["count"], 3);

        let (_, single) = post_embed(app, r#"{"text": "world"}"#).await;
        let batched = batch["embeddings"][1].as_array().unwrap();
        let alone = single["embeddings"][0].as_array().unwrap();
        for (a, b) in batched.iter().zip(alone) {
            let (a, b) = (a.as_f64().unwrap(), b.as_f64().unwrap());
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_text_takes_precedence_over_texts() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, json) =
            post_embed(app, r#"{"text": "hello", "texts": ["a", "b", "c"]}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn test_prefix_selects_role() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (_, default_role) = post_embed(app.clone(), r#"{"text": "hello"}"#).await;
        let (_, passage) =
            post_embed(app.clone(), r#"{"text": "hello", "prefix": "passage"}"#).await;
        let (_, query) = post_embed(app, r#"{"text": "hello", "prefix": "query"}"#).await;

        assert_eq!(default_role["embeddings"], passage["embeddings"]);
        assert_ne!(query["embeddings"], passage["embeddings"]);
    }

    #[tokio::test]
    async fn test_missing_text_is_bad_request() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, json) = post_embed(app, "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("text"), "error should name the field: {}", error);
    }

    #[tokio::test]
    async fn test_empty_texts_is_bad_request() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, json) = post_embed(app, r#"{"texts": []}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_batch_over_limit_is_bad_request() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 2);
        let (status, json) = post_embed(app, r#"{"texts": ["a", "b", "c"]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "texts");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let (status, json) = post_embed(app, r#"{"texts": ["unterminated"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_inference_failure_is_internal_error() {
        let app = setup_app(
            MockInferenceEngine::new(HIDDEN).failing_on(POISON_TOKEN_ID),
            256,
        );
        let (status, json) = post_embed(app.clone(), r#"{"texts": ["hello", "poison"]}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("inference failed"));

        // The service keeps answering after a failed request
        let (status, _) = post_embed(app, r#"{"text": "hello"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_is_not_allowed() {
        let app = setup_app(MockInferenceEngine::new(HIDDEN), 256);
        let request = Request::builder()
            .method(Method::GET)
            .uri("/embed")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
