// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use std::collections::HashSet;

/// Find the sliding window of length `length` (in chars) containing the most
/// query-token matches, and pad with ellipses where the window is cut off
/// mid-text (spec.md §4.5 step 6).
pub fn extract_snippet(text: &str, query: &str, length: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= length {
        return text.to_string();
    }

    let tokens: HashSet<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let lower: Vec<char> = text.to_lowercase().chars().collect();
    let mut best_start = 0usize;
    let mut best_hits = -1i64;

    for start in 0..=(chars.len() - length) {
        let window: String = lower[start..start + length].iter().collect();
        let hits = tokens
            .iter()
            .filter(|t| window.contains(t.as_str()))
            .count() as i64;
        if hits > best_hits {
            best_hits = hits;
            best_start = start;
        }
    }

    let end = best_start + length;
    let window: String = chars[best_start..end].iter().collect();
    let prefix = if best_start > 0 { "…" } else { "" };
    let suffix = if end < chars.len() { "…" } else { "" };
    format!("{prefix}{window}{suffix}")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
