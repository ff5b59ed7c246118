// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// The closed set of lesson sections. Unknown section names fail to
/// deserialize rather than being silently accepted, per spec.md §9
/// ("reject unknown tags at parse time to detect drift").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonSection {
    BigPicture,
    Metaphor,
    CoreMechanism,
    ToyExampleCode,
    MemoryHook,
    RealLife,
    BestPractices,
}

impl LessonSection {
    pub const ALL: [LessonSection; 7] = [
        LessonSection::BigPicture,
        LessonSection::Metaphor,
        LessonSection::CoreMechanism,
        LessonSection::ToyExampleCode,
        LessonSection::MemoryHook,
        LessonSection::RealLife,
        LessonSection::BestPractices,
    ];
}

/// The lesson document: seven named textual sections. The schema is closed —
/// there is no catch-all field, so a patch targeting an unknown section
/// cannot be represented once parsed (it is rejected earlier, at the
/// `PatchPlanItem` deserialization boundary).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDocument {
    #[serde(default)]
    pub big_picture: String,
    #[serde(default)]
    pub metaphor: String,
    #[serde(default)]
    pub core_mechanism: String,
    #[serde(default)]
    pub toy_example_code: String,
    #[serde(default)]
    pub memory_hook: String,
    #[serde(default)]
    pub real_life: String,
    #[serde(default)]
    pub best_practices: String,
}

impl LessonDocument {
    pub fn get(&self, section: LessonSection) -> &str {
        match section {
            LessonSection::BigPicture => &self.big_picture,
            LessonSection::Metaphor => &self.metaphor,
            LessonSection::CoreMechanism => &self.core_mechanism,
            LessonSection::ToyExampleCode => &self.toy_example_code,
            LessonSection::MemoryHook => &self.memory_hook,
            LessonSection::RealLife => &self.real_life,
            LessonSection::BestPractices => &self.best_practices,
        }
    }

    pub fn set(&mut self, section: LessonSection, text: String) {
        match section {
            LessonSection::BigPicture => self.big_picture = text,
            LessonSection::Metaphor => self.metaphor = text,
            LessonSection::CoreMechanism => self.core_mechanism = text,
            LessonSection::ToyExampleCode => self.toy_example_code = text,
            LessonSection::MemoryHook => self.memory_hook = text,
            LessonSection::RealLife => self.real_life = text,
            LessonSection::BestPractices => self.best_practices = text,
        }
    }
}

/// One item of a patch plan: a targeted section, a human-readable
/// description of the change, and the replacement text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchPlanItem {
    pub section: LessonSection,
    pub description: String,
    pub replacement: String,
}

/// An ordered sequence of patch items. Last write wins when multiple items
/// target the same section (enforced by the applier, not by this type).
pub type PatchPlan = Vec<PatchPlanItem>;

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip_for_every_section() {
        let mut doc = LessonDocument::default();
        for section in LessonSection::ALL {
            doc.set(section, format!("{section:?}-text"));
        }
        for section in LessonSection::ALL {
            assert_eq!(doc.get(section), format!("{section:?}-text"));
        }
    }

    #[test]
    fn unknown_section_fails_to_deserialize() {
        let item: Result<PatchPlanItem, _> = serde_json::from_str(
            r#"{"section":"conclusion","description":"x","replacement":"y"}"#,
        );
        assert!(item.is_err());
    }

    #[test]
    fn known_section_round_trips_through_json() {
        let item = PatchPlanItem {
            section: LessonSection::BigPicture,
            description: "rewrite intro".into(),
            replacement: "New intro.".into(),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"big_picture\""));
        let back: PatchPlanItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back.section, LessonSection::BigPicture);
    }

    #[test]
    fn default_lesson_document_has_empty_sections() {
        let doc = LessonDocument::default();
        for section in LessonSection::ALL {
            assert_eq!(doc.get(section), "");
        }
    }
}
