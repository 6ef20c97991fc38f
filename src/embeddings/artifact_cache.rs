// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Artifact cache for runtime-native models
//!
//! Converting a source model into an optimised ONNX graph is expensive, so it
//! is done once per model and the result is kept under
//! `<cache_root>/<sanitized model id>/`:
//!
//! ```text
//! /app/cache/onnx/intfloat_e5-small-v2/
//! ├── model.onnx
//! └── tokenizer.json
//! ```
//!
//! Population is staged in a hidden directory inside the cache root and
//! renamed into place, so readers never observe a half-written artifact. When
//! two processes race, the first rename wins and the loser discards its copy.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::errors::{EmbeddingError, Result};
use super::model_id::ModelIdentifier;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Default cache root used by the container image
pub const DEFAULT_CACHE_ROOT: &str = "/app/cache/onnx";

/// Produces a native artifact for a model into an empty directory
///
/// Implementations must leave at least [`MODEL_FILE`] and [`TOKENIZER_FILE`]
/// in `dest`. They are only called when no artifact exists yet.
pub trait ArtifactExporter: Send + Sync {
    fn export(&self, model_id: &ModelIdentifier, dest: &Path) -> anyhow::Result<()>;
}

/// Location of a materialised artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    pub fn is_complete(&self) -> bool {
        self.model_path().is_file() && self.tokenizer_path().is_file()
    }
}

pub struct ArtifactCache<E> {
    root: PathBuf,
    exporter: E,
}

impl<E: ArtifactExporter> ArtifactCache<E> {
    pub fn new(root: impl Into<PathBuf>, exporter: E) -> Self {
        Self {
            root: root.into(),
            exporter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic artifact location for `model_id`; may not exist yet
    pub fn artifact_paths(&self, model_id: &ModelIdentifier) -> ArtifactPaths {
        ArtifactPaths::new(self.root.join(model_id.cache_dir_name()))
    }

    /// Returns the cached artifact, exporting it first if it is missing
    ///
    /// # Errors
    /// All failures are `EmbeddingError::Startup`: the service cannot run
    /// without a model, and conversion is never retried.
    pub fn ensure_artifact(&self, model_id: &ModelIdentifier) -> Result<ArtifactPaths> {
        let paths = self.artifact_paths(model_id);

        if paths.is_complete() {
            info!(model = %model_id, path = %paths.dir().display(), "Loading cached ONNX model");
            return Ok(paths);
        }

        if paths.dir().exists() {
            return Err(EmbeddingError::startup(format!(
                "Incomplete artifact at {} (expected {} and {}); remove it to re-export",
                paths.dir().display(),
                MODEL_FILE,
                TOKENIZER_FILE
            )));
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            EmbeddingError::startup(format!(
                "Failed to create cache root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)
            .map_err(|e| {
                EmbeddingError::startup(format!(
                    "Failed to create staging directory in {}: {}",
                    self.root.display(),
                    e
                ))
            })?;

        info!(model = %model_id, "Converting model to ONNX (first run only)...");
        let started = Instant::now();

        self.exporter
            .export(model_id, staging.path())
            .map_err(|e| {
                EmbeddingError::startup(format!("Failed to export {}: {:#}", model_id, e))
            })?;

        let staged = ArtifactPaths::new(staging.path());
        if !staged.is_complete() {
            return Err(EmbeddingError::startup(format!(
                "Export of {} did not produce {} and {}",
                model_id, MODEL_FILE, TOKENIZER_FILE
            )));
        }

        match fs::rename(staging.path(), paths.dir()) {
            Ok(()) => {
                info!(
                    model = %model_id,
                    path = %paths.dir().display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "ONNX model cached"
                );
            }
            Err(e) if paths.is_complete() => {
                // Another process populated the same path first; its copy is equivalent
                warn!(model = %model_id, error = %e, "Artifact populated concurrently, using existing copy");
            }
            Err(e) => {
                return Err(EmbeddingError::startup(format!(
                    "Failed to move artifact into {}: {}",
                    paths.dir().display(),
                    e
                )));
            }
        }

        // `staging` is dropped here; after a successful rename there is nothing left to remove
        Ok(paths)
    }
}
