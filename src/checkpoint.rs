// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Checkpoint Store
//!
//! Named, content-hashed, immutable snapshots of arbitrary state data.
//!
//! # Semantics
//! - `state_hash` must always match a fresh digest of `state_data`
//! - Rollback verifies the hash before handing state back (tamper detection)
//! - Rollback returns a copy; applying it is the caller's job
//! - Pruning is oldest-first and never drops the current checkpoint

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::canonical::hash_payload;
use crate::config::DigestAlgorithm;
use crate::error::CheckpointError;
use crate::types::Payload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    id: String,
    timestamp: String,
    state_hash: String,
    state_data: Payload,
    metadata: Payload,
}

impl Checkpoint {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn state_hash(&self) -> &str {
        &self.state_hash
    }

    pub fn state_data(&self) -> &Payload {
        &self.state_data
    }

    pub fn metadata(&self) -> &Payload {
        &self.metadata
    }

    /// Returns the freshly computed hash when it disagrees with the stored one.
    fn integrity_mismatch(&self, algorithm: DigestAlgorithm) -> Option<String> {
        let computed = hash_payload(algorithm, &self.state_data);
        (computed != self.state_hash).then_some(computed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStats {
    pub total_checkpoints: usize,
    pub current_checkpoint: Option<String>,
    pub oldest_checkpoint: Option<String>,
    pub newest_checkpoint: Option<String>,
}

#[derive(Debug)]
pub struct CheckpointStore {
    algorithm: DigestAlgorithm,
    checkpoints: HashMap<String, Checkpoint>,
    /// Creation order, oldest first.
    order: VecDeque<String>,
    current: Option<String>,
    max_checkpoints: Option<usize>,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

impl CheckpointStore {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            checkpoints: HashMap::new(),
            order: VecDeque::new(),
            current: None,
            max_checkpoints: None,
        }
    }

    /// Prune automatically down to `max` after every create.
    pub fn with_retention(mut self, max: Option<usize>) -> Self {
        self.max_checkpoints = max;
        self
    }

    /// Snapshot `state_data` and make it the current checkpoint.
    ///
    /// Without an explicit `id`, one is derived from the state hash prefix and
    /// the creation time (`ckpt_<hash16>_<unix micros>`), suffixed if taken.
    pub fn create_checkpoint(
        &mut self,
        state_data: Payload,
        id: Option<String>,
        metadata: Option<Payload>,
    ) -> Result<Checkpoint, CheckpointError> {
        let now = Utc::now();
        let state_hash = hash_payload(self.algorithm, &state_data);

        let id = match id {
            Some(id) if self.checkpoints.contains_key(&id) => {
                return Err(CheckpointError::DuplicateId(id));
            }
            Some(id) => id,
            None => self.derive_id(&state_hash, now.timestamp_micros()),
        };

        let checkpoint = Checkpoint {
            id: id.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            state_hash,
            state_data,
            metadata: metadata.unwrap_or_default(),
        };

        self.checkpoints.insert(id.clone(), checkpoint.clone());
        self.order.push_back(id.clone());
        self.current = Some(id);

        tracing::debug!("Checkpoint created: {}", checkpoint.id);

        if let Some(max) = self.max_checkpoints {
            self.prune_checkpoints(max);
        }

        Ok(checkpoint)
    }

    fn derive_id(&self, state_hash: &str, micros: i64) -> String {
        let prefix = &state_hash[..state_hash.len().min(16)];
        let base = format!("ckpt_{}_{}", prefix, micros);
        if !self.checkpoints.contains_key(&base) {
            return base;
        }
        (1u64..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.checkpoints.contains_key(candidate))
            .unwrap_or(base)
    }

    /// Look up `id` and check its state against the stored hash, without
    /// moving the current pointer.
    pub fn verify_checkpoint(&self, id: &str) -> Result<&Checkpoint, CheckpointError> {
        let checkpoint = self
            .checkpoints
            .get(id)
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))?;

        if let Some(computed) = checkpoint.integrity_mismatch(self.algorithm) {
            tracing::error!("Checkpoint {} failed integrity check", id);
            return Err(CheckpointError::IntegrityFailure {
                id: id.to_string(),
                stored: checkpoint.state_hash.clone(),
                computed,
            });
        }
        Ok(checkpoint)
    }

    /// Verify and return a copy of the state stored under `id`, moving the
    /// current pointer there.
    pub fn rollback_to(&mut self, id: &str) -> Result<Payload, CheckpointError> {
        let state = self.verify_checkpoint(id)?.state_data.clone();
        self.current = Some(id.to_string());
        tracing::info!("Rolled back to checkpoint {}", id);
        Ok(state)
    }

    /// Ids whose stored hash no longer matches their state, oldest first.
    pub fn verify_all_checkpoints(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|id| self.checkpoints.get(id))
            .filter(|cp| cp.integrity_mismatch(self.algorithm).is_some())
            .map(|cp| cp.id.clone())
            .collect()
    }

    /// Remove the oldest checkpoints until at most `keep_count` remain,
    /// skipping the current one. Returns how many were removed.
    pub fn prune_checkpoints(&mut self, keep_count: usize) -> usize {
        if self.order.len() <= keep_count {
            return 0;
        }

        let mut to_remove = self.order.len() - keep_count;
        let mut retained = VecDeque::with_capacity(keep_count + 1);
        let mut removed = 0;

        while let Some(id) = self.order.pop_front() {
            if to_remove > 0 && self.current.as_deref() != Some(id.as_str()) {
                self.checkpoints.remove(&id);
                to_remove -= 1;
                removed += 1;
            } else {
                retained.push_back(id);
            }
        }
        self.order = retained;

        if removed > 0 {
            tracing::debug!("Pruned {} checkpoints, {} retained", removed, self.order.len());
        }
        removed
    }

    pub fn get_checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.get(id)
    }

    pub fn get_current_checkpoint(&self) -> Option<&Checkpoint> {
        self.current.as_deref().and_then(|id| self.checkpoints.get(id))
    }

    /// All checkpoints in creation order.
    pub fn list_checkpoints(&self) -> Vec<&Checkpoint> {
        self.order
            .iter()
            .filter_map(|id| self.checkpoints.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn stats(&self) -> CheckpointStats {
        CheckpointStats {
            total_checkpoints: self.order.len(),
            current_checkpoint: self.current.clone(),
            oldest_checkpoint: self.order.front().cloned(),
            newest_checkpoint: self.order.back().cloned(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state_data_mut(&mut self, id: &str) -> Option<&mut Payload> {
        self.checkpoints.get_mut(id).map(|cp| &mut cp.state_data)
    }
}
