// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic Execution Core
//!
//! Runs one caller-supplied operation under the fatal invariants and records
//! its lifecycle in the hash chain.
//!
//! # Protocol
//! ```text
//! PENDING
//! ↓  1. pre-checks (oversight, authorization system, safety level)
//! PRE_CHECKED
//! ↓  2. checkpoint {contract_id, timestamp, execution_count} + rollback check
//! CHECKPOINTED
//! ↓  3. append execution_started
//! RUNNING
//! ↓  4. operation(parameters)  ── Err ──> append execution_failed → FAILED
//! ↓  5. append execution_completed (output_hash)
//! ↓  6. post-checks (chain integrity, event emission)
//! COMMITTED
//! ```
//!
//! A fatal violation at any step returns [`Outcome::Halted`]. Violations in
//! step 1 happen before anything is logged or checkpointed. Once
//! `execution_started` is committed, the execution always ends in either
//! `execution_completed` or `execution_failed` (or halts).

pub mod context;
pub mod shared;

pub use context::{ExecutionContext, ExecutionResult, Outcome};
pub use shared::SharedExecutionCore;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{self, Display};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::canonical::hash_value;
use crate::chain::{now_timestamp, ChainProof, HashChain, MerkleProof};
use crate::checkpoint::{CheckpointStats, CheckpointStore};
use crate::config::CoreConfig;
use crate::error::ChainResult;
use crate::invariants::{InvariantGuard, InvariantViolation};
use crate::storage::{EntrySink, FileSink};
use crate::types::Payload;

/// Authorization capability the engine consults for human oversight.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, context: &ExecutionContext) -> bool;
}

/// Trusts the context's own `authorized` flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagAuthorizer;

impl Authorizer for FlagAuthorizer {
    fn authorize(&self, context: &ExecutionContext) -> bool {
        context.authorized
    }
}

/// Kinds of entries the core writes to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ExecutionStarted,
    ExecutionCompleted,
    ExecutionFailed,
    InvariantViolation,
    RollbackExecuted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ExecutionStarted => "execution_started",
            EventType::ExecutionCompleted => "execution_completed",
            EventType::ExecutionFailed => "execution_failed",
            EventType::InvariantViolation => "invariant_violation",
            EventType::RollbackExecuted => "rollback_executed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Pending,
    PreChecked,
    Checkpointed,
    Running,
    Committed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_executions: u64,
    pub chain_length: usize,
    pub chain_root_hash: String,
    pub chain_valid: bool,
    pub checkpoint_stats: CheckpointStats,
}

/// Digest of canonical `(output, contract_id)`.
pub fn compute_output_hash(config: &CoreConfig, output: &Value, contract_id: &str) -> String {
    hash_value(
        config.digest,
        &json!({
            "output": output,
            "contract_id": contract_id,
        }),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());
    format!("operation panicked: {}", detail)
}

fn event(event_type: EventType, contract_id: &str) -> Payload {
    let mut data = Payload::new();
    data.insert("event_type".into(), json!(event_type.as_str()));
    data.insert("contract_id".into(), json!(contract_id));
    data
}

pub struct ExecutionCore {
    config: CoreConfig,
    chain: HashChain,
    checkpoints: CheckpointStore,
    authorizer: Option<Arc<dyn Authorizer>>,
    total_executions: u64,
}

impl fmt::Debug for ExecutionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionCore")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("checkpoints", &self.checkpoints.len())
            .field("has_authorizer", &self.authorizer.is_some())
            .field("total_executions", &self.total_executions)
            .finish()
    }
}

impl ExecutionCore {
    /// In-memory engine with the flag authorizer wired in.
    pub fn new(config: CoreConfig) -> Self {
        let chain = HashChain::with_sink(
            config.digest,
            &config.genesis_tag,
            Box::new(crate::storage::MemorySink::new()),
        );
        Self::with_chain(config, chain)
    }

    /// Engine on top of an existing (possibly restored) chain.
    pub fn with_chain(config: CoreConfig, chain: HashChain) -> Self {
        let checkpoints = CheckpointStore::new(config.digest).with_retention(config.max_checkpoints);
        Self {
            config,
            chain,
            checkpoints,
            authorizer: Some(Arc::new(FlagAuthorizer)),
            total_executions: 0,
        }
    }

    /// Engine whose chain is persisted to (and restored from) `path`.
    pub fn open_persistent(config: CoreConfig, path: impl AsRef<Path>) -> ChainResult<Self> {
        let path = path.as_ref();
        let sink = FileSink::open(path)?;
        let entries = FileSink::read_entries(path)?;
        let sink: Box<dyn EntrySink> = Box::new(sink);
        let chain = HashChain::restore(config.digest, &config.genesis_tag, entries, sink)?;
        Ok(Self::with_chain(config, chain))
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Remove the authorization capability. Every execution will then halt on
    /// the authorization-system invariant.
    pub fn without_authorizer(mut self) -> Self {
        self.authorizer = None;
        self
    }

    fn advance(&self, phase: ExecutionPhase, contract_id: &str) {
        tracing::debug!(contract_id, ?phase, "execution phase");
    }

    /// Execute `operation` against `context.parameters`.
    ///
    /// Returns `Outcome::Completed` for success and for a recovered operation
    /// error, `Outcome::Halted` for any fatal invariant violation.
    pub fn execute<F, E>(&mut self, context: &ExecutionContext, operation: F, create_checkpoint: bool) -> Outcome
    where
        F: FnOnce(&Payload) -> Result<Value, E>,
        E: Display,
    {
        let started = Instant::now();
        let contract_id = context.contract_id.as_str();
        self.advance(ExecutionPhase::Pending, contract_id);

        // Step 1: pre-checks. Nothing is logged or checkpointed on failure.
        let has_authorizer = self.authorizer.is_some();
        let authorized = match &self.authorizer {
            Some(authorizer) => authorizer.authorize(context),
            None => context.authorized,
        };
        if let Err(violation) = InvariantGuard::pre_execution(context.safety_level, authorized, has_authorizer) {
            return Outcome::Halted(violation);
        }
        self.advance(ExecutionPhase::PreChecked, contract_id);

        let execution_count = self.total_executions;
        self.total_executions += 1;
        metrics::increment_counter!("qradle_executions_total");

        // Step 2: checkpoint.
        let checkpoint_id = if create_checkpoint {
            let mut state = Payload::new();
            state.insert("contract_id".into(), json!(contract_id));
            state.insert("timestamp".into(), json!(context.timestamp));
            state.insert("execution_count".into(), json!(execution_count));

            match self.checkpoints.create_checkpoint(state, None, None) {
                Ok(checkpoint) => Some(checkpoint.id().to_string()),
                Err(e) => {
                    tracing::error!("Checkpoint creation failed for {}: {}", contract_id, e);
                    None
                }
            }
        } else {
            None
        };
        if let Err(violation) = InvariantGuard::check_rollback_capability(create_checkpoint, checkpoint_id.is_some()) {
            return Outcome::Halted(violation);
        }
        if checkpoint_id.is_some() {
            self.advance(ExecutionPhase::Checkpointed, contract_id);
        }

        // Step 3: execution_started. From here on the execution must end in a
        // completion or failure entry.
        let chain_len_before = self.chain.len();
        let mut start_event = event(EventType::ExecutionStarted, contract_id);
        start_event.insert("timestamp".into(), json!(context.timestamp));
        start_event.insert(
            "safety_level".into(),
            json!(context.safety_level.map(|level| level.as_str())),
        );
        if let Err(violation) = self.commit(start_event, EventType::ExecutionStarted) {
            return Outcome::Halted(violation);
        }
        self.advance(ExecutionPhase::Running, contract_id);

        // Step 4: run the operation. A panic is a failed execution like any
        // other error; it must not skip the closing entry.
        let run = panic::catch_unwind(AssertUnwindSafe(|| operation(&context.parameters)));
        let outcome = match run {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(payload) => Err(panic_message(payload.as_ref())),
        };
        let output = match outcome {
            Ok(output) => output,
            Err(message) => {
                tracing::warn!("Execution of {} failed: {}", contract_id, message);
                metrics::increment_counter!("qradle_execution_failures_total");

                let mut failed_event = event(EventType::ExecutionFailed, contract_id);
                failed_event.insert("error".into(), json!(message));
                failed_event.insert("timestamp".into(), json!(context.timestamp));
                if let Err(violation) = self.commit(failed_event, EventType::ExecutionFailed) {
                    return Outcome::Halted(violation);
                }
                self.advance(ExecutionPhase::Failed, contract_id);

                return Outcome::Completed(ExecutionResult {
                    success: false,
                    output: Value::Null,
                    output_hash: String::new(),
                    execution_time: started.elapsed().as_secs_f64(),
                    events_emitted: 1,
                    checkpoint_id,
                    error: Some(message),
                });
            }
        };

        // Step 5: fingerprint and execution_completed.
        let output_hash = compute_output_hash(&self.config, &output, contract_id);
        let mut completed_event = event(EventType::ExecutionCompleted, contract_id);
        completed_event.insert("output_hash".into(), json!(output_hash));
        completed_event.insert("timestamp".into(), json!(context.timestamp));
        if let Err(violation) = self.commit(completed_event, EventType::ExecutionCompleted) {
            return Outcome::Halted(violation);
        }

        // Step 6: post-checks.
        let appended = self.chain.len().saturating_sub(chain_len_before);
        if let Err(violation) = InvariantGuard::post_execution(self.chain.verify_chain_integrity(), appended) {
            self.record_violation(contract_id, &violation);
            return Outcome::Halted(violation);
        }
        self.advance(ExecutionPhase::Committed, contract_id);

        let execution_time = started.elapsed().as_secs_f64();
        metrics::histogram!("qradle_execution_duration_seconds", execution_time);
        tracing::info!(contract_id, output_hash = %output_hash, "execution committed");

        Outcome::Completed(ExecutionResult {
            success: true,
            output,
            output_hash,
            execution_time,
            events_emitted: 2,
            checkpoint_id,
            error: None,
        })
    }

    /// Append a lifecycle entry; a storage failure is an event-emission violation.
    fn commit(&mut self, data: Payload, event_type: EventType) -> Result<(), InvariantViolation> {
        let committed = match self.chain.append(data) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to append {}: {}", event_type.as_str(), e);
                false
            }
        };
        InvariantGuard::check_event_committed(committed, event_type.as_str())
    }

    /// Best-effort `invariant_violation` entry.
    fn record_violation(&mut self, contract_id: &str, violation: &InvariantViolation) {
        let mut data = event(EventType::InvariantViolation, contract_id);
        data.insert("invariant".into(), json!(violation.kind.as_str()));
        data.insert("message".into(), json!(violation.message));
        data.insert("timestamp".into(), json!(now_timestamp()));
        if let Err(e) = self.chain.append(data) {
            tracing::warn!("Could not log invariant violation for {}: {}", contract_id, e);
        }
    }

    /// Restore checkpoint `id` and log it. Any failure yields `false`.
    ///
    /// The current pointer only moves once the `rollback_executed` entry is
    /// committed.
    pub fn rollback_to_checkpoint(&mut self, id: &str) -> bool {
        let state_hash = match self.checkpoints.verify_checkpoint(id) {
            Ok(checkpoint) => checkpoint.state_hash().to_string(),
            Err(e) => {
                tracing::warn!("Rollback to {} failed: {}", id, e);
                return false;
            }
        };

        let mut data = Payload::new();
        data.insert("event_type".into(), json!(EventType::RollbackExecuted.as_str()));
        data.insert("checkpoint_id".into(), json!(id));
        data.insert("state_hash".into(), json!(state_hash));
        data.insert("timestamp".into(), json!(now_timestamp()));

        if let Err(e) = self.chain.append(data) {
            tracing::error!("Rollback to {} could not be logged: {}", id, e);
            return false;
        }

        match self.checkpoints.rollback_to(id) {
            Ok(_) => {
                tracing::info!("Rollback to {} executed", id);
                true
            }
            Err(e) => {
                tracing::error!("Rollback to {} failed after logging: {}", id, e);
                false
            }
        }
    }

    /// Index of the latest `execution_completed` entry for `contract_id`.
    fn latest_completion(&self, contract_id: &str) -> Option<usize> {
        self.chain.entries().iter().rposition(|entry| {
            entry.event_type() == Some(EventType::ExecutionCompleted.as_str())
                && entry.contract_id() == Some(contract_id)
        })
    }

    /// Linear chain proof for the latest completion of `contract_id`.
    pub fn get_execution_proof(&self, contract_id: &str) -> Option<ChainProof> {
        let index = self.latest_completion(contract_id)?;
        self.chain.get_proof(index).ok()
    }

    /// Merkle inclusion proof for the latest completion of `contract_id`.
    pub fn get_execution_merkle_proof(&self, contract_id: &str) -> Option<MerkleProof> {
        let index = self.latest_completion(contract_id)?;
        self.chain.get_merkle_proof(index).ok()
    }

    /// True if the latest completion of `contract_id` carries
    /// `expected_output_hash` and the chain is intact.
    pub fn verify_execution(&self, contract_id: &str, expected_output_hash: &str) -> bool {
        let Some(index) = self.latest_completion(contract_id) else {
            return false;
        };
        let recorded = self
            .chain
            .get(index)
            .and_then(|entry| entry.data().get("output_hash"))
            .and_then(Value::as_str);

        recorded == Some(expected_output_hash) && self.chain.verify_chain_integrity()
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            total_executions: self.total_executions,
            chain_length: self.chain.len(),
            chain_root_hash: self.chain.get_root_hash(),
            chain_valid: self.chain.verify_chain_integrity(),
            checkpoint_stats: self.checkpoints.stats(),
        }
    }

    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn total_executions(&self) -> u64 {
        self.total_executions
    }

    #[cfg(test)]
    pub(crate) fn chain_mut(&mut self) -> &mut HashChain {
        &mut self.chain
    }

    #[cfg(test)]
    pub(crate) fn checkpoints_mut(&mut self) -> &mut CheckpointStore {
        &mut self.checkpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::InvariantKind;
    use crate::types::SafetyLevel;

    fn params(x: i64, y: i64) -> Payload {
        let mut p = Payload::new();
        p.insert("x".into(), json!(x));
        p.insert("y".into(), json!(y));
        p
    }

    fn add(p: &Payload) -> Result<Value, String> {
        let x = p.get("x").and_then(Value::as_i64).ok_or("missing x")?;
        let y = p.get("y").and_then(Value::as_i64).ok_or("missing y")?;
        Ok(json!(x + y))
    }

    #[test]
    fn test_successful_execution() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(10, 20));

        let result = core.execute(&ctx, add, true).into_result().unwrap();

        assert!(result.success);
        assert_eq!(result.output, json!(30));
        assert_eq!(result.events_emitted, 2);
        assert!(result.checkpoint_id.is_some());
        assert_eq!(result.output_hash.len(), 64);
        assert!(result.error.is_none());

        let events: Vec<_> = core.chain().entries().iter().filter_map(|e| e.event_type()).collect();
        assert_eq!(events, vec!["execution_started", "execution_completed"]);
        assert_eq!(core.total_executions(), 1);
    }

    #[test]
    fn test_started_entry_records_safety_level() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2)).with_safety_level(SafetyLevel::Elevated);
        let _ = core.execute(&ctx, add, false);

        let started = core.chain().get(0).unwrap();
        assert_eq!(started.data()["safety_level"], json!("ELEVATED"));
        assert_eq!(started.data()["timestamp"], json!(ctx.timestamp));
    }

    #[test]
    fn test_checkpoint_state_shape() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let _ = core.execute(&ctx, add, true);
        let result = core.execute(&ctx, add, true).into_result().unwrap();

        let cp = core.checkpoints().get_checkpoint(result.checkpoint_id.as_deref().unwrap()).unwrap();
        assert_eq!(cp.state_data()["contract_id"], json!("add"));
        assert_eq!(cp.state_data()["execution_count"], json!(1));
    }

    #[test]
    fn test_no_checkpoint_when_not_requested() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let result = core.execute(&ctx, add, false).into_result().unwrap();

        assert!(result.checkpoint_id.is_none());
        assert!(core.checkpoints().is_empty());
    }

    #[test]
    fn test_oversight_halts_before_side_effects() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("risky", params(1, 2))
            .with_safety_level(SafetyLevel::Sensitive)
            .with_authorized(false);

        let outcome = core.execute(&ctx, add, true);

        assert!(outcome.is_halted());
        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::HumanOversight);
        assert!(core.chain().is_empty());
        assert!(core.checkpoints().is_empty());
        assert_eq!(core.total_executions(), 0);
    }

    #[test]
    fn test_missing_authorizer_halts() {
        let mut core = ExecutionCore::new(CoreConfig::default()).without_authorizer();
        let ctx = ExecutionContext::new("add", params(1, 2));

        let outcome = core.execute(&ctx, add, true);
        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::AuthorizationSystem);
        assert!(core.chain().is_empty());
    }

    #[test]
    fn test_undeclared_safety_level_halts() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2)).with_safety_level(None);

        let outcome = core.execute(&ctx, add, true);
        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::SafetyLevelDeclared);
    }

    struct DenyAll;

    impl Authorizer for DenyAll {
        fn authorize(&self, _context: &ExecutionContext) -> bool {
            false
        }
    }

    #[test]
    fn test_custom_authorizer_overrides_flag() {
        let mut core = ExecutionCore::new(CoreConfig::default()).with_authorizer(Arc::new(DenyAll));
        let ctx = ExecutionContext::new("add", params(1, 2))
            .with_safety_level(SafetyLevel::Critical)
            .with_authorized(true);

        let outcome = core.execute(&ctx, add, true);
        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::HumanOversight);

        // Routine work does not need the authorizer's approval.
        let routine = ExecutionContext::new("add", params(1, 2));
        assert!(!core.execute(&routine, add, true).is_halted());
    }

    #[test]
    fn test_operation_failure_is_recovered() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ok = ExecutionContext::new("add", params(1, 2));
        let _ = core.execute(&ok, add, true);
        let prior: Vec<_> = core.chain().entries().to_vec();

        let ctx = ExecutionContext::new("broken", Payload::new());
        let result = core.execute(&ctx, add, true).into_result().unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing x"));
        assert_eq!(result.events_emitted, 1);
        assert!(result.checkpoint_id.is_some());
        assert_eq!(result.output, Value::Null);

        assert_eq!(&core.chain().entries()[..prior.len()], prior.as_slice());
        assert!(core.chain().verify_chain_integrity());
        assert_eq!(core.chain().entries().last().unwrap().event_type(), Some("execution_failed"));
        assert_eq!(core.chain().entries().last().unwrap().data()["error"], json!("missing x"));
    }

    #[test]
    fn test_corrupted_chain_halts_after_commit() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let _ = core.execute(&ctx, add, false);

        core.chain_mut().entries_mut()[0].data_mut().insert("contract_id".into(), json!("forged"));

        let outcome = core.execute(&ctx, add, false);
        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::ChainIntegrity);
        assert_eq!(
            core.chain().entries().last().unwrap().event_type(),
            Some("invariant_violation")
        );
    }

    #[test]
    fn test_output_hash_is_deterministic() {
        let mut a = ExecutionCore::new(CoreConfig::default());
        let mut b = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(10, 20));

        let ra = a.execute(&ctx, add, true).into_result().unwrap();
        let rb = b.execute(&ctx, add, false).into_result().unwrap();
        assert_eq!(ra.output_hash, rb.output_hash);
        assert_eq!(ra.output_hash, compute_output_hash(&CoreConfig::default(), &json!(30), "add"));

        let other = ExecutionContext::new("add-2", params(10, 20));
        let rc = a.execute(&other, add, false).into_result().unwrap();
        assert_ne!(ra.output_hash, rc.output_hash);
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let first = core.execute(&ctx, add, true).into_result().unwrap();
        let _ = core.execute(&ctx, add, true);

        let id = first.checkpoint_id.unwrap();
        assert!(core.rollback_to_checkpoint(&id));
        assert_eq!(core.checkpoints().get_current_checkpoint().unwrap().id(), id);

        let last = core.chain().entries().last().unwrap();
        assert_eq!(last.event_type(), Some("rollback_executed"));
        assert_eq!(last.data()["checkpoint_id"], json!(id));

        assert!(!core.rollback_to_checkpoint("nope"));
    }

    #[test]
    fn test_rollback_refuses_tampered_checkpoint() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let result = core.execute(&ctx, add, true).into_result().unwrap();
        let id = result.checkpoint_id.unwrap();
        let len_before = core.chain().len();

        core.checkpoints_mut()
            .state_data_mut(&id)
            .unwrap()
            .insert("execution_count".into(), json!(42));

        assert!(!core.rollback_to_checkpoint(&id));
        assert_eq!(core.chain().len(), len_before);
    }

    #[test]
    fn test_execution_proof_and_verification() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(2, 3));
        let result = core.execute(&ctx, add, true).into_result().unwrap();

        let proof = core.get_execution_proof("add").unwrap();
        assert_eq!(proof.chain_position, 1);
        assert!(core.chain().verify_proof(&proof));
        assert!(core.get_execution_merkle_proof("add").unwrap().verify());

        assert!(core.verify_execution("add", &result.output_hash));
        assert!(!core.verify_execution("add", "0000"));
        assert!(!core.verify_execution("unknown", &result.output_hash));
        assert!(core.get_execution_proof("unknown").is_none());
    }

    #[test]
    fn test_proof_targets_latest_completion() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let _ = core.execute(&ExecutionContext::new("add", params(1, 1)), add, false);
        let _ = core.execute(&ExecutionContext::new("other", params(1, 1)), add, false);
        let latest = core.execute(&ExecutionContext::new("add", params(5, 5)), add, false);

        let proof = core.get_execution_proof("add").unwrap();
        assert_eq!(proof.chain_position, 5);
        assert!(proof.proof_path.is_empty());
        assert!(core.verify_execution("add", &latest.into_result().unwrap().output_hash));
    }

    #[test]
    fn test_stats() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("add", params(1, 2));
        let _ = core.execute(&ctx, add, true);
        let _ = core.execute(&ctx, add, true);

        let stats = core.get_stats();
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.chain_length, 4);
        assert_eq!(stats.chain_root_hash, core.chain().get_root_hash());
        assert!(stats.chain_valid);
        assert_eq!(stats.checkpoint_stats.total_checkpoints, 2);
    }

    #[test]
    fn test_panicking_operation_is_recorded_as_failure() {
        let mut core = ExecutionCore::new(CoreConfig::default());
        let ctx = ExecutionContext::new("explodes", params(1, 2));

        let result = core
            .execute(&ctx, |_: &Payload| -> Result<Value, String> { panic!("divide by zero") }, true)
            .into_result()
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("operation panicked: divide by zero"));

        let events: Vec<_> = core.chain().entries().iter().filter_map(|e| e.event_type()).collect();
        assert_eq!(events, vec!["execution_started", "execution_failed"]);
        assert!(core.chain().verify_chain_integrity());

        let next = core.execute(&ExecutionContext::new("add", params(1, 2)), add, false);
        assert!(next.into_result().unwrap().success);
    }

    struct FailAfter {
        remaining: usize,
    }

    impl EntrySink for FailAfter {
        fn persist(&mut self, _entry: &crate::chain::LogEntry) -> crate::error::StorageResult<()> {
            if self.remaining == 0 {
                return Err(crate::error::StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.remaining -= 1;
            Ok(())
        }

        fn persisted_count(&self) -> u64 {
            0
        }
    }

    fn core_failing_after(appends: usize) -> ExecutionCore {
        let config = CoreConfig::default();
        let chain = HashChain::with_sink(
            config.digest,
            &config.genesis_tag,
            Box::new(FailAfter { remaining: appends }),
        );
        ExecutionCore::with_chain(config, chain)
    }

    #[test]
    fn test_unlogged_rollback_keeps_current_pointer() {
        let mut core = core_failing_after(4);
        let first = core.execute(&ExecutionContext::new("a", params(1, 1)), add, true);
        let second = core.execute(&ExecutionContext::new("b", params(2, 2)), add, true);
        let first_id = first.into_result().unwrap().checkpoint_id.unwrap();
        let second_id = second.into_result().unwrap().checkpoint_id.unwrap();

        assert!(!core.rollback_to_checkpoint(&first_id));
        assert_eq!(core.checkpoints().get_current_checkpoint().unwrap().id(), second_id);
        assert_eq!(core.chain().len(), 4);
    }

    #[test]
    fn test_storage_failure_on_start_halts() {
        let mut core = core_failing_after(0);
        let outcome = core.execute(&ExecutionContext::new("a", params(1, 1)), add, false);

        assert_eq!(outcome.violation().unwrap().kind, InvariantKind::EventEmission);
        assert!(core.chain().is_empty());
    }

    #[test]
    fn test_debug_output_names_the_core() {
        let core = ExecutionCore::new(CoreConfig::default());
        let rendered = format!("{:?}", core);
        assert!(rendered.starts_with("ExecutionCore"));
        assert!(rendered.contains("total_executions: 0"));
    }
}
