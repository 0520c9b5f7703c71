// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fatal Invariants
//!
//! Stateless battery of checks guarding every execution. Each check is a pure
//! predicate over the facts the caller passes in; there is no hidden global
//! state. A failed check yields an [`InvariantViolation`], which halts the
//! execution in progress and is never retried automatically.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::SafetyLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantKind {
    HumanOversight,
    AuthorizationSystem,
    SafetyLevelDeclared,
    RollbackCapability,
    EventEmission,
    ChainIntegrity,
}

impl InvariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvariantKind::HumanOversight => "human_oversight",
            InvariantKind::AuthorizationSystem => "authorization_system",
            InvariantKind::SafetyLevelDeclared => "safety_level_declared",
            InvariantKind::RollbackCapability => "rollback_capability",
            InvariantKind::EventEmission => "event_emission",
            InvariantKind::ChainIntegrity => "chain_integrity",
        }
    }
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal, non-recoverable invariant failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("FATAL invariant violation [{kind}]: {message}")]
pub struct InvariantViolation {
    pub kind: InvariantKind,
    pub message: String,
}

impl InvariantViolation {
    fn raise(kind: InvariantKind, message: String) -> Self {
        tracing::error!(invariant = kind.as_str(), "{}", message);
        metrics::increment_counter!("qradle_invariant_violations_total", "invariant" => kind.as_str());
        Self { kind, message }
    }
}

pub type InvariantResult = Result<(), InvariantViolation>;

/// Namespace for the invariant checks.
pub struct InvariantGuard;

impl InvariantGuard {
    /// SENSITIVE and above require an authorized human in the loop.
    pub fn check_human_oversight(level: SafetyLevel, authorized: bool) -> InvariantResult {
        if level.requires_human_oversight() && !authorized {
            return Err(InvariantViolation::raise(
                InvariantKind::HumanOversight,
                format!("safety level {} requires human authorization", level),
            ));
        }
        Ok(())
    }

    /// The engine must have an authorization capability wired in.
    pub fn check_authorization_system(has_authorization_system: bool) -> InvariantResult {
        if !has_authorization_system {
            return Err(InvariantViolation::raise(
                InvariantKind::AuthorizationSystem,
                "no authorization system is configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_safety_level_declared(level: Option<SafetyLevel>) -> InvariantResult {
        if level.is_none() {
            return Err(InvariantViolation::raise(
                InvariantKind::SafetyLevelDeclared,
                "execution context declares no safety level".to_string(),
            ));
        }
        Ok(())
    }

    /// A requested checkpoint must exist before the operation may run.
    pub fn check_rollback_capability(checkpoint_requested: bool, checkpoint_created: bool) -> InvariantResult {
        if checkpoint_requested && !checkpoint_created {
            return Err(InvariantViolation::raise(
                InvariantKind::RollbackCapability,
                "checkpoint was requested but could not be created".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_event_emission(events_appended: usize) -> InvariantResult {
        if events_appended == 0 {
            return Err(InvariantViolation::raise(
                InvariantKind::EventEmission,
                "execution emitted no log entries".to_string(),
            ));
        }
        Ok(())
    }

    /// A lifecycle entry the execution depends on could not be committed.
    pub fn check_event_committed(committed: bool, event_type: &str) -> InvariantResult {
        if !committed {
            return Err(InvariantViolation::raise(
                InvariantKind::EventEmission,
                format!("failed to commit {} entry", event_type),
            ));
        }
        Ok(())
    }

    pub fn check_chain_integrity(chain_valid: bool) -> InvariantResult {
        if !chain_valid {
            return Err(InvariantViolation::raise(
                InvariantKind::ChainIntegrity,
                "hash chain failed integrity verification".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks run before anything is logged or checkpointed.
    pub fn pre_execution(
        level: Option<SafetyLevel>,
        authorized: bool,
        has_authorization_system: bool,
    ) -> InvariantResult {
        if let Some(level) = level {
            Self::check_human_oversight(level, authorized)?;
        }
        Self::check_authorization_system(has_authorization_system)?;
        Self::check_safety_level_declared(level)
    }

    /// Checks run after the completion entry is committed.
    pub fn post_execution(chain_valid: bool, events_appended: usize) -> InvariantResult {
        Self::check_chain_integrity(chain_valid)?;
        Self::check_event_emission(events_appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_oversight() {
        assert!(InvariantGuard::check_human_oversight(SafetyLevel::Routine, false).is_ok());
        assert!(InvariantGuard::check_human_oversight(SafetyLevel::Elevated, false).is_ok());
        for level in [SafetyLevel::Sensitive, SafetyLevel::Critical, SafetyLevel::Existential] {
            let err = InvariantGuard::check_human_oversight(level, false).unwrap_err();
            assert_eq!(err.kind, InvariantKind::HumanOversight);
            assert!(InvariantGuard::check_human_oversight(level, true).is_ok());
        }
    }

    #[test]
    fn test_individual_checks() {
        assert_eq!(
            InvariantGuard::check_authorization_system(false).unwrap_err().kind,
            InvariantKind::AuthorizationSystem
        );
        assert_eq!(
            InvariantGuard::check_safety_level_declared(None).unwrap_err().kind,
            InvariantKind::SafetyLevelDeclared
        );
        assert_eq!(
            InvariantGuard::check_rollback_capability(true, false).unwrap_err().kind,
            InvariantKind::RollbackCapability
        );
        assert!(InvariantGuard::check_rollback_capability(false, false).is_ok());
        assert_eq!(
            InvariantGuard::check_event_emission(0).unwrap_err().kind,
            InvariantKind::EventEmission
        );
        assert_eq!(
            InvariantGuard::check_chain_integrity(false).unwrap_err().kind,
            InvariantKind::ChainIntegrity
        );
    }

    #[test]
    fn test_pre_execution_order() {
        // Oversight is reported before a missing authorization system.
        let err = InvariantGuard::pre_execution(Some(SafetyLevel::Critical), false, false).unwrap_err();
        assert_eq!(err.kind, InvariantKind::HumanOversight);

        let err = InvariantGuard::pre_execution(Some(SafetyLevel::Routine), false, false).unwrap_err();
        assert_eq!(err.kind, InvariantKind::AuthorizationSystem);

        let err = InvariantGuard::pre_execution(None, true, true).unwrap_err();
        assert_eq!(err.kind, InvariantKind::SafetyLevelDeclared);

        assert!(InvariantGuard::pre_execution(Some(SafetyLevel::Sensitive), true, true).is_ok());
    }

    #[test]
    fn test_post_execution() {
        assert!(InvariantGuard::post_execution(true, 2).is_ok());
        assert_eq!(
            InvariantGuard::post_execution(false, 2).unwrap_err().kind,
            InvariantKind::ChainIntegrity
        );
        assert_eq!(
            InvariantGuard::post_execution(true, 0).unwrap_err().kind,
            InvariantKind::EventEmission
        );
    }

    #[test]
    fn test_violation_display() {
        let err = InvariantGuard::check_chain_integrity(false).unwrap_err();
        assert!(err.to_string().starts_with("FATAL invariant violation [chain_integrity]"));
    }
}
