// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HuggingFace Hub exporter
//!
//! Fetches a model's ONNX export and tokenizer from the Hub, then lets ONNX
//! Runtime apply its offline graph optimisations and serialise the optimised
//! graph as the cached `model.onnx`. The hub download cache is kept separate
//! from the artifact cache and can be discarded once the artifact exists.

use anyhow::{anyhow, Context};
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::artifact_cache::{ArtifactExporter, MODEL_FILE, TOKENIZER_FILE};
use super::model_id::ModelIdentifier;

/// Where ONNX exports are usually published inside a model repository
const ONNX_CANDIDATES: &[&str] = &["onnx/model.onnx", "model.onnx"];

/// Tokenizer side files copied alongside `tokenizer.json` when present
const OPTIONAL_FILES: &[&str] = &["config.json", "tokenizer_config.json", "special_tokens_map.json"];

#[derive(Debug, Clone, Default)]
pub struct HubOnnxExporter {
    revision: Option<String>,
    hub_cache_dir: Option<PathBuf>,
}

impl HubOnnxExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_hub_cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.hub_cache_dir = dir;
        self
    }
}

impl ArtifactExporter for HubOnnxExporter {
    fn export(&self, model_id: &ModelIdentifier, dest: &Path) -> anyhow::Result<()> {
        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = &self.hub_cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build().context("Failed to create HuggingFace Hub client")?;

        let repo = match &self.revision {
            Some(revision) => api.repo(Repo::with_revision(
                model_id.as_str().to_string(),
                RepoType::Model,
                revision.clone(),
            )),
            None => api.model(model_id.as_str().to_string()),
        };

        let mut source = None;
        for candidate in ONNX_CANDIDATES {
            match repo.get(candidate) {
                Ok(path) => {
                    source = Some(path);
                    break;
                }
                Err(e) => {
                    debug!(model = %model_id, file = *candidate, error = %e, "ONNX candidate unavailable")
                }
            }
        }
        let source = source.ok_or_else(|| {
            anyhow!(
                "{} publishes no ONNX export (tried {:?})",
                model_id,
                ONNX_CANDIDATES
            )
        })?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .with_context(|| format!("Failed to download {} for {}", TOKENIZER_FILE, model_id))?;

        info!(model = %model_id, source = %source.display(), "Optimising ONNX graph");
        optimise_graph(&source, &dest.join(MODEL_FILE))?;

        fs::copy(&tokenizer, dest.join(TOKENIZER_FILE))
            .with_context(|| format!("Failed to copy {}", tokenizer.display()))?;
        for file in OPTIONAL_FILES {
            if let Ok(path) = repo.get(file) {
                fs::copy(&path, dest.join(file))
                    .with_context(|| format!("Failed to copy {}", path.display()))?;
            }
        }

        Ok(())
    }
}

/// Serialises the runtime-optimised graph of `source` to `target`.
///
/// Extended (level 2) optimisations only: layout transforms at level 3 are
/// specific to the machine doing the export.
fn optimise_graph(source: &Path, target: &Path) -> anyhow::Result<()> {
    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level2)
        .context("Failed to set optimization level")?
        .with_optimized_model_path(target)
        .context("Failed to set optimized model path")?
        .commit_from_file(source)
        .context(format!("Failed to load ONNX model from {}", source.display()))?;
    drop(session);

    if !target.is_file() {
        anyhow::bail!("ONNX Runtime did not write {}", target.display());
    }
    Ok(())
}
