// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Artifact cache tests
//!
//! A fixture exporter writes a real tokenizer file so the cached artifact can
//! be loaded the same way `main` loads it.

use fabstir_embed_node::embeddings::{
    artifact_cache::{MODEL_FILE, TOKENIZER_FILE},
    mock::{word_level_tokenizer, MockInferenceEngine},
    ArtifactCache, ArtifactExporter, EmbeddingContext, EmbeddingPipeline, ErrorKind,
    ModelIdentifier, PrefixMode, TokenizerAdapter, PASSAGE_PREFIX,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct FixtureExporter {
    calls: Arc<AtomicUsize>,
    delay: Duration,
}

impl FixtureExporter {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            delay: Duration::ZERO,
        }
    }
}

impl ArtifactExporter for FixtureExporter {
    fn export(&self, _model_id: &ModelIdentifier, dest: &Path) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let tokenizer = word_level_tokenizer(&["cats", "purr"])?;
        tokenizer
            .save(dest.join(TOKENIZER_FILE), false)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        fs::write(dest.join(MODEL_FILE), b"fixture graph")?;
        Ok(())
    }
}

fn e5_model() -> ModelIdentifier {
    ModelIdentifier::new("intfloat/e5-small-v2").unwrap()
}

#[cfg(test)]
mod artifact_cache_tests {
    use super::*;

    #[test]
    fn test_second_start_reuses_artifact() {
        let root = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = ArtifactCache::new(root.path(), FixtureExporter::new(calls.clone()))
            .ensure_artifact(&e5_model())
            .unwrap();

        // A fresh cache instance models a process restart
        let second = ArtifactCache::new(root.path(), FixtureExporter::new(calls.clone()))
            .ensure_artifact(&e5_model())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_models_get_distinct_directories() {
        let root = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ArtifactCache::new(root.path(), FixtureExporter::new(calls.clone()));

        let e5 = cache.ensure_artifact(&e5_model()).unwrap();
        let minilm = cache
            .ensure_artifact(&ModelIdentifier::new("sentence-transformers/all-MiniLM-L6-v2").unwrap())
            .unwrap();

        assert_ne!(e5.dir(), minilm.dir());
        assert!(e5.dir().starts_with(root.path()));
        assert!(minilm.dir().starts_with(root.path()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cached_tokenizer_loads_into_pipeline() {
        let root = TempDir::new().unwrap();
        let cache = ArtifactCache::new(
            root.path(),
            FixtureExporter::new(Arc::new(AtomicUsize::new(0))),
        );
        let model = e5_model();
        let artifact = cache.ensure_artifact(&model).unwrap();

        let tokenizer =
            TokenizerAdapter::from_file(artifact.tokenizer_path(), PrefixMode::detect(&model), 512)
                .unwrap();
        assert_eq!(tokenizer.prefix_mode(), PrefixMode::E5);

        let context =
            EmbeddingContext::new(model, tokenizer, Box::new(MockInferenceEngine::new(8))).unwrap();
        let pipeline = EmbeddingPipeline::new(Arc::new(context));

        let result = pipeline
            .embed(&["cats purr".to_string()], PASSAGE_PREFIX)
            .unwrap();
        assert_eq!(result.vectors.len(), 1);
        assert_eq!(result.dimension, 8);
    }

    #[test]
    fn test_concurrent_population_yields_one_complete_artifact() {
        let root = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let root = root.path().to_path_buf();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    let exporter = FixtureExporter {
                        calls,
                        delay: Duration::from_millis(50),
                    };
                    ArtifactCache::new(root, exporter).ensure_artifact(&e5_model())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for result in &results {
            let paths = result.as_ref().unwrap();
            assert!(paths.is_complete());
        }

        // Only the final directory remains; losing writers cleaned up after themselves
        let entries: Vec<String> = fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["intfloat_e5-small-v2".to_string()]);
    }

    #[test]
    fn test_missing_tokenizer_file_is_startup_error() {
        let root = TempDir::new().unwrap();
        let err = TokenizerAdapter::from_file(
            root.path().join(TOKENIZER_FILE),
            PrefixMode::Disabled,
            512,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Startup);
    }
}
