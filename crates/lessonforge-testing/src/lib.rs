// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
mod scripted_agent;
mod scripted_retriever;

pub use scripted_agent::{response_with, response_with_usage, ScriptedAgentHandle, ScriptedOutcome};
pub use scripted_retriever::{candidate, FailingEmbedder, FixedEmbedder, StaticIndexBackend};
