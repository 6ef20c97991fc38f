// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /similarity: cosine similarity of a query and a passage

pub mod handler;
pub mod request;

pub use handler::similarity_handler;
pub use request::{SimilarityRequest, SimilarityResponse};
