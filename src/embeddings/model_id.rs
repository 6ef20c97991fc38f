// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model identity and prompt prefix convention
//!
//! A [`ModelIdentifier`] names the single model served by the process. It
//! determines where the materialised artifact lives on disk and, unless
//! overridden, whether texts get E5-style role prefixes.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use super::errors::{EmbeddingError, Result};

/// Default model: intfloat/e5-small-v2 (384 dimensions, E5 prefixing)
pub const DEFAULT_MODEL: &str = "intfloat/e5-small-v2";

/// HuggingFace-style model identifier, e.g. `intfloat/e5-small-v2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelIdentifier(String);

impl ModelIdentifier {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EmbeddingError::startup("model identifier cannot be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name for this model inside the artifact cache root.
    ///
    /// Path separators and any character outside `[A-Za-z0-9._-]` become `_`,
    /// so `intfloat/e5-small-v2` maps to `intfloat_e5-small-v2`. Names that
    /// would resolve to `.` or `..` are prefixed with `_`.
    pub fn cache_dir_name(&self) -> String {
        let sanitized: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.chars().all(|c| c == '.') {
            format!("_{}", sanitized)
        } else {
            sanitized
        }
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether texts are prepended with a `"{role}: "` label before tokenization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMode {
    /// E5-family convention: `query: ...` / `passage: ...`
    E5,
    /// Texts are tokenized as given
    Disabled,
}

impl PrefixMode {
    /// Name-based heuristic: any identifier containing `e5` (case-insensitive)
    pub fn detect(model_id: &ModelIdentifier) -> Self {
        if model_id.as_str().to_lowercase().contains("e5") {
            PrefixMode::E5
        } else {
            PrefixMode::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, PrefixMode::E5)
    }

    pub fn apply<'a>(&self, text: &'a str, prefix: &str) -> Cow<'a, str> {
        match self {
            PrefixMode::E5 => Cow::Owned(format!("{}: {}", prefix, text)),
            PrefixMode::Disabled => Cow::Borrowed(text),
        }
    }
}
