// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use lessonforge_types::{LessonDocument, PatchPlan};

/// Apply an ordered patch plan to a lesson document (spec.md §4.7). Pure:
/// takes a document by value and returns the patched copy.
///
/// Rejecting a plan item that targets a section outside the closed set
/// happens earlier, at the `PatchPlanItem` deserialization boundary —
/// `LessonSection` is a closed enum that fails to parse for any other tag,
/// so by the time a `PatchPlan` reaches this function every item is
/// already known-valid. Items are applied in order; the last item for a
/// given section determines its final value (empty replacement text is
/// legal and clears the section).
pub fn apply(mut lesson: LessonDocument, plan: &PatchPlan) -> LessonDocument {
    for item in plan {
        lesson.set(item.section, item.replacement.clone());
    }
    lesson
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
