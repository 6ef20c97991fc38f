// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_embed_node::{
    api::{http_server::start_server, AppState},
    config::ServiceConfig,
    embeddings::{
        ArtifactCache, EmbeddingContext, EmbeddingError, EmbeddingPipeline, HubOnnxExporter,
        OnnxEmbeddingModel, TokenizerAdapter,
    },
};
use std::{env, sync::Arc};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::parse();
    config.validate()?;

    println!("🚀 Starting {}", fabstir_embed_node::version::get_version_string());
    println!("📦 BUILD VERSION: {}", fabstir_embed_node::version::VERSION);
    println!();

    // Conversion and model loading are blocking and must finish before any traffic is accepted
    let startup_config = config.clone();
    let pipeline = match tokio::task::spawn_blocking(move || load_pipeline(&startup_config)).await? {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("❌ Failed to load embedding model: {}", e);
            eprintln!("   The service will not start without a usable model.");
            std::process::exit(1);
        }
    };

    let context = pipeline.context();
    println!("✅ Embedding model ready");
    println!("   Model:       {}", context.model_id());
    println!("   Runtime:     {}", context.runtime_name());
    println!("   Dimension:   {}", context.dimension());
    println!("   E5 prefixes: {}", context.prefix_mode().is_enabled());
    println!();
    println!("  Health:       GET  http://{}/health", config.listen_addr);
    println!("  Embed:        POST http://{}/embed", config.listen_addr);
    println!("  Similarity:   POST http://{}/similarity", config.listen_addr);

    let state = AppState::new(pipeline).with_max_batch_size(config.max_batch_size);
    start_server(config.listen_addr, state).await?;

    println!("\n⏹️  Shut down cleanly");
    Ok(())
}

/// Materialises the artifact if needed, then loads tokenizer and model from it
fn load_pipeline(config: &ServiceConfig) -> Result<EmbeddingPipeline, EmbeddingError> {
    let model_id = config.model_id().map_err(EmbeddingError::startup)?;
    let prefix_mode = config.prefix_mode_for(&model_id);
    info!(model = %model_id, prefix_mode = ?prefix_mode, "Loading ONNX model");

    let exporter = HubOnnxExporter::new()
        .with_revision(config.revision.clone())
        .with_hub_cache_dir(config.hub_cache_dir.clone());
    let cache = ArtifactCache::new(&config.cache_dir, exporter);
    let artifact = cache.ensure_artifact(&model_id)?;

    let tokenizer =
        TokenizerAdapter::from_file(artifact.tokenizer_path(), prefix_mode, config.max_length)?;
    let engine = OnnxEmbeddingModel::new(
        model_id.as_str(),
        artifact.model_path(),
        &config.session_options(),
    )?;

    let context = EmbeddingContext::new(model_id, tokenizer, Box::new(engine))?;
    Ok(EmbeddingPipeline::new(Arc::new(context)))
}
