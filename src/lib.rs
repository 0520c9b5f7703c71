// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! qradle-kernel: deterministic execution and audit core.
//!
//! Executes caller-supplied operations under fail-closed safety invariants,
//! records every execution in a tamper-evident hash chain and keeps
//! hash-verified checkpoints for rollback.

pub mod config;
pub mod error;
pub mod types;
pub mod canonical;
pub mod chain;
pub mod storage;
pub mod checkpoint;
pub mod invariants;
pub mod engine;
pub mod contract;

#[cfg(test)]
mod tests;

pub use chain::{ChainProof, HashChain, LogEntry, MerkleProof};
pub use checkpoint::{Checkpoint, CheckpointStats, CheckpointStore};
pub use config::{CoreConfig, DigestAlgorithm};
pub use contract::{ContractLayer, ContractValidation};
pub use engine::{
    Authorizer, EngineStats, ExecutionContext, ExecutionCore, ExecutionResult, FlagAuthorizer,
    Outcome, SharedExecutionCore,
};
pub use error::{ChainError, CheckpointError, ContractError, StorageError};
pub use invariants::{InvariantGuard, InvariantKind, InvariantViolation};
pub use types::{Payload, SafetyLevel};
