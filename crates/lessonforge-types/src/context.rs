// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// A single retrieval result handed to a pipeline step as context: a
/// reference to the source document, a combined relevance score in
/// `[0, 1]`, and a bounded snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDocument {
    pub source: String,
    pub combined_score: f32,
    pub snippet: String,
}

impl ContextDocument {
    pub fn new(source: impl Into<String>, combined_score: f32, snippet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            combined_score: combined_score.clamp(0.0, 1.0),
            snippet: snippet.into(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_clamped_into_unit_interval() {
        let over = ContextDocument::new("doc-1", 1.5, "snippet");
        let under = ContextDocument::new("doc-2", -0.5, "snippet");
        assert_eq!(over.combined_score, 1.0);
        assert_eq!(under.combined_score, 0.0);
    }

    #[test]
    fn in_range_score_is_unchanged() {
        let doc = ContextDocument::new("doc", 0.42, "snippet");
        assert_eq!(doc.combined_score, 0.42);
    }
}
