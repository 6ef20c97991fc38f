// Version information for the Fabstir embedding node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-onnx-embeddings-2025-11-03";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "onnx-runtime",
    "artifact-cache",
    "mean-pooling",
    "l2-normalization",
    "e5-prefix-mode",
    "similarity",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Embed Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
