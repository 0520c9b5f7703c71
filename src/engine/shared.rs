// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Thread-safe handle to an [`ExecutionCore`].
//!
//! Executions and rollbacks take the write lock, so appends are serialized
//! and the chain stays linear. Proofs, stats and verification share the read
//! lock and never observe a half-appended entry.

use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::{EngineStats, ExecutionContext, ExecutionCore, Outcome};
use crate::chain::{ChainProof, MerkleProof};
use crate::types::Payload;

#[derive(Clone)]
pub struct SharedExecutionCore {
    inner: Arc<RwLock<ExecutionCore>>,
}

impl SharedExecutionCore {
    pub fn new(core: ExecutionCore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(core)),
        }
    }

    // Operation panics are caught inside `execute`, and no core method leaves
    // a half-applied append behind, so a poisoned lock is safe to reuse.
    fn read_guard(&self) -> RwLockReadGuard<'_, ExecutionCore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, ExecutionCore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn execute<F, E>(&self, context: &ExecutionContext, operation: F, create_checkpoint: bool) -> Outcome
    where
        F: FnOnce(&Payload) -> Result<Value, E>,
        E: Display,
    {
        self.write_guard().execute(context, operation, create_checkpoint)
    }

    pub fn rollback_to_checkpoint(&self, id: &str) -> bool {
        self.write_guard().rollback_to_checkpoint(id)
    }

    pub fn get_execution_proof(&self, contract_id: &str) -> Option<ChainProof> {
        self.read_guard().get_execution_proof(contract_id)
    }

    pub fn get_execution_merkle_proof(&self, contract_id: &str) -> Option<MerkleProof> {
        self.read_guard().get_execution_merkle_proof(contract_id)
    }

    pub fn verify_execution(&self, contract_id: &str, expected_output_hash: &str) -> bool {
        self.read_guard().verify_execution(contract_id, expected_output_hash)
    }

    pub fn verify_proof(&self, proof: &ChainProof) -> bool {
        self.read_guard().chain().verify_proof(proof)
    }

    pub fn verify_chain_integrity(&self) -> bool {
        self.read_guard().chain().verify_chain_integrity()
    }

    pub fn get_stats(&self) -> EngineStats {
        self.read_guard().get_stats()
    }

    /// Run `f` against a consistent snapshot of the core.
    pub fn read<R>(&self, f: impl FnOnce(&ExecutionCore) -> R) -> R {
        let guard = self.read_guard();
        f(&*guard)
    }
}
