// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("index backend query failed: {0}")]
    BackendFailed(String),
}
