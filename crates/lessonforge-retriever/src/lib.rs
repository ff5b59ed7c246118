// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod backend;
mod error;
mod mmr;
mod retriever;
mod scoring;
mod snippet;

pub use backend::{Candidate, Embedder, IndexBackend};
pub use error::RetrieverError;
pub use retriever::Retriever;
