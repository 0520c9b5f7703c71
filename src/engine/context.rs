// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Execution descriptors and results.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chain::now_timestamp;
use crate::invariants::InvariantViolation;
use crate::types::{Payload, SafetyLevel};

/// Caller-supplied descriptor of one execution. Read-only for the duration
/// of the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub contract_id: String,
    pub parameters: Payload,
    pub timestamp: String,
    pub safety_level: Option<SafetyLevel>,
    pub authorized: bool,
    pub metadata: Payload,
}

impl ExecutionContext {
    /// ROUTINE, unauthorized, stamped with the current time.
    pub fn new(contract_id: impl Into<String>, parameters: Payload) -> Self {
        Self {
            contract_id: contract_id.into(),
            parameters,
            timestamp: now_timestamp(),
            safety_level: Some(SafetyLevel::Routine),
            authorized: false,
            metadata: Payload::new(),
        }
    }

    pub fn with_safety_level(mut self, level: impl Into<Option<SafetyLevel>>) -> Self {
        self.safety_level = level.into();
        self
    }

    pub fn with_authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Payload) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: Value,
    /// Determinism fingerprint: digest of canonical `(output, contract_id)`.
    /// Empty when the operation failed.
    pub output_hash: String,
    /// Wall-clock seconds.
    pub execution_time: f64,
    pub events_emitted: u32,
    pub checkpoint_id: Option<String>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Flatten into a plain map.
    pub fn to_payload(&self) -> Payload {
        let mut out = Payload::new();
        out.insert("success".into(), json!(self.success));
        out.insert("output".into(), self.output.clone());
        out.insert("output_hash".into(), json!(self.output_hash));
        out.insert("execution_time".into(), json!(self.execution_time));
        out.insert("events_emitted".into(), json!(self.events_emitted));
        out.insert("checkpoint_id".into(), json!(self.checkpoint_id));
        out.insert("error".into(), json!(self.error));
        out
    }
}

/// What an execution ended in.
///
/// `Completed` covers both success and a recovered operation failure
/// (`success == false`). `Halted` means a fatal invariant stopped the
/// execution; there is no result to inspect.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(ExecutionResult),
    Halted(InvariantViolation),
}

impl Outcome {
    pub fn into_result(self) -> Result<ExecutionResult, InvariantViolation> {
        match self {
            Outcome::Completed(result) => Ok(result),
            Outcome::Halted(violation) => Err(violation),
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Outcome::Halted(_))
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Outcome::Completed(result) => Some(result),
            Outcome::Halted(_) => None,
        }
    }

    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Halted(violation) => Some(violation),
        }
    }
}
