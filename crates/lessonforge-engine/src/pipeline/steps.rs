// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT

/// One entry of the fixed, ordered step program (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub name: &'static str,
    pub agent: &'static str,
    pub requires_context: bool,
    /// Whether this step is billable against the session's LLM cost budget.
    pub llm_billable: bool,
    /// Whether this step is billable against the session's image cost
    /// budget (only the visualizer, currently).
    pub image_billable: bool,
}

/// The fixed step program: `summarizer, explainer, critic, visualizer`.
pub const STEP_PROGRAM: [StepSpec; 4] = [
    StepSpec {
        name: "summarizer",
        agent: "summarizer",
        requires_context: true,
        llm_billable: true,
        image_billable: false,
    },
    StepSpec {
        name: "explainer",
        agent: "explainer",
        requires_context: true,
        llm_billable: true,
        image_billable: false,
    },
    StepSpec {
        name: "critic",
        agent: "critic",
        requires_context: false,
        llm_billable: true,
        image_billable: false,
    },
    StepSpec {
        name: "visualizer",
        agent: "visualizer",
        requires_context: false,
        llm_billable: false,
        image_billable: true,
    },
];

/// Whether a step failure at this step always terminates the pipeline,
/// regardless of retry exhaustion policy (spec.md §9 open question 1): the
/// critic's output feeds the patch applier, so a failed critic leaves
/// nothing meaningful to finalize.
pub fn step_failure_is_always_terminal(step: &StepSpec) -> bool {
    step.name == "critic"
}
