// Copyright (c) 2026 Lessonforge Contributors
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

/// The error taxonomy from spec.md §7, as a discriminant separate from the
/// `Display` message — callers branch on `kind()` rather than string-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing topic, unknown agent, patch targets an unknown section.
    /// Reported synchronously to the caller; never retried.
    InputInvalid,
    /// Rate-limit or cost-limit denial. Reported synchronously with
    /// remaining-quota details; never retried by the core.
    QuotaExceeded,
    /// Network faults, 5xx, timeouts from a worker. Retryable per policy.
    TransientAgent,
    /// 4xx, explicit non-retryable markers, schema mismatches.
    TerminalAgent,
    /// Retrieval or persistence failure. Degraded behavior only; logged,
    /// never surfaced to the client.
    AuxiliarySubsystem,
    /// Cooperative cancellation propagated from the caller.
    Cancelled,
}

impl ErrorKind {
    /// Whether a failure of this kind should be retried by the dispatcher's
    /// caller (the pipeline engine's per-step retry loop).
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientAgent)
    }
}

/// The core error type, carried through step records and event payloads.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("input invalid: {0}")]
    InputInvalid(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transient agent failure: {0}")]
    TransientAgent(String),

    #[error("terminal agent failure: {0}")]
    TerminalAgent(String),

    #[error("auxiliary subsystem degraded: {0}")]
    AuxiliarySubsystem(String),

    #[error("cancelled")]
    Cancelled,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InputInvalid(_) => ErrorKind::InputInvalid,
            CoreError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            CoreError::TransientAgent(_) => ErrorKind::TransientAgent,
            CoreError::TerminalAgent(_) => ErrorKind::TerminalAgent,
            CoreError::AuxiliarySubsystem(_) => ErrorKind::AuxiliarySubsystem,
            CoreError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Wrap this error with the step name and attempt count, per spec.md §7's
    /// propagation policy ("errors local to a step are wrapped with step name
    /// and attempt count before being stored in the step record").
    pub fn wrap_step(&self, step: &str, attempt: u32) -> String {
        format!("step={step} attempt={attempt}: {self}")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_agent_is_retryable() {
        assert!(ErrorKind::TransientAgent.is_retryable());
        assert!(!ErrorKind::TerminalAgent.is_retryable());
        assert!(!ErrorKind::InputInvalid.is_retryable());
        assert!(!ErrorKind::QuotaExceeded.is_retryable());
        assert!(!ErrorKind::AuxiliarySubsystem.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            CoreError::TransientAgent("timeout".into()).kind(),
            ErrorKind::TransientAgent
        );
        assert_eq!(CoreError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn wrap_step_includes_step_and_attempt() {
        let err = CoreError::TerminalAgent("400".into());
        let wrapped = err.wrap_step("critic", 2);
        assert!(wrapped.contains("step=critic"));
        assert!(wrapped.contains("attempt=2"));
        assert!(wrapped.contains("400"));
    }
}
