// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Hash Chain
//!
//! Tamper-evident log of everything the execution core does.
//!
//! # Invariants
//! - `entry[0].previous_hash == genesis_hash`
//! - `entry[i].previous_hash == entry[i - 1].entry_hash`
//! - `entry[i].entry_hash == H(canonical(data, timestamp, previous_hash))`
//! - Entries are never mutated or removed once appended
//!
//! Integrity problems are reported (`bool` / `Result`), never panicked on.

pub mod entry;
pub mod merkle;
pub mod proof;

pub use entry::{compute_entry_hash, LogEntry};
pub use merkle::MerkleProof;
pub use proof::ChainProof;

use chrono::{SecondsFormat, Utc};

use crate::canonical::{digest_hex, Hash32};
use crate::config::{DigestAlgorithm, DEFAULT_GENESIS_TAG};
use crate::error::{ChainError, ChainResult};
use crate::storage::{EntrySink, MemorySink};
use crate::types::Payload;

/// Current UTC time, RFC 3339 with microseconds.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// First broken link found by [`HashChain::verify_chain_detailed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainViolation {
    /// Stored `entry_hash` does not match the recomputed digest.
    HashMismatch { index: usize },
    /// `previous_hash` does not point at the preceding entry (or genesis).
    BrokenLink { index: usize },
}

impl ChainViolation {
    pub fn index(&self) -> usize {
        match self {
            ChainViolation::HashMismatch { index } | ChainViolation::BrokenLink { index } => *index,
        }
    }
}

pub struct HashChain {
    algorithm: DigestAlgorithm,
    genesis_hash: String,
    entries: Vec<LogEntry>,
    sink: Box<dyn EntrySink>,
}

impl std::fmt::Debug for HashChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChain")
            .field("algorithm", &self.algorithm)
            .field("genesis_hash", &self.genesis_hash)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

impl HashChain {
    /// In-memory chain seeded with the default genesis tag.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self::with_sink(algorithm, DEFAULT_GENESIS_TAG, Box::new(MemorySink::new()))
    }

    pub fn with_sink(algorithm: DigestAlgorithm, genesis_tag: &str, sink: Box<dyn EntrySink>) -> Self {
        Self {
            algorithm,
            genesis_hash: digest_hex(algorithm, genesis_tag.as_bytes()),
            entries: Vec::new(),
            sink,
        }
    }

    /// Rebuild a chain from previously persisted entries.
    ///
    /// Refuses to start on top of a log that fails integrity.
    pub fn restore(
        algorithm: DigestAlgorithm,
        genesis_tag: &str,
        entries: Vec<LogEntry>,
        sink: Box<dyn EntrySink>,
    ) -> ChainResult<Self> {
        let chain = Self::restore_unverified(algorithm, genesis_tag, entries, sink);
        if let Err(violation) = chain.verify_chain_detailed() {
            tracing::error!("Restored chain failed integrity: {:?}", violation);
            return Err(ChainError::Corrupted(violation.index()));
        }
        tracing::info!("Restored chain with {} entries", chain.entries.len());
        Ok(chain)
    }

    /// Rebuild a chain without checking it, for forensic inspection of a log
    /// that may be corrupted. Call [`Self::verify_chain_detailed`] before
    /// trusting it.
    pub fn restore_unverified(
        algorithm: DigestAlgorithm,
        genesis_tag: &str,
        entries: Vec<LogEntry>,
        sink: Box<dyn EntrySink>,
    ) -> Self {
        let mut chain = Self::with_sink(algorithm, genesis_tag, sink);
        chain.entries = entries;
        chain
    }

    /// Append `data` as a new entry linked to the current tail.
    ///
    /// The sink is written first; on a sink failure the in-memory chain is
    /// left untouched. With the default in-memory sink this never fails.
    pub fn append(&mut self, data: Payload) -> ChainResult<LogEntry> {
        let previous_hash = self.get_root_hash();
        let entry = LogEntry::seal(self.algorithm, data, now_timestamp(), previous_hash);

        self.sink.persist(&entry)?;
        self.entries.push(entry.clone());

        metrics::gauge!("qradle_chain_length", self.entries.len() as f64);
        Ok(entry)
    }

    /// True if every entry's hash and link check out (vacuously for empty).
    pub fn verify_chain_integrity(&self) -> bool {
        self.verify_chain_detailed().is_ok()
    }

    /// Walk from genesis forward and report the first mismatch.
    pub fn verify_chain_detailed(&self) -> Result<(), ChainViolation> {
        let mut expected_prev = self.genesis_hash.as_str();

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.recompute_hash(self.algorithm) != entry.entry_hash() {
                return Err(ChainViolation::HashMismatch { index });
            }
            if entry.previous_hash() != expected_prev {
                return Err(ChainViolation::BrokenLink { index });
            }
            expected_prev = entry.entry_hash();
        }

        Ok(())
    }

    /// Suffix proof for the entry at `index`.
    pub fn get_proof(&self, index: usize) -> ChainResult<ChainProof> {
        let entry = self.entries.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;

        Ok(ChainProof {
            entry_hash: entry.entry_hash().to_string(),
            chain_position: index,
            proof_path: self.entries[index + 1..]
                .iter()
                .map(|e| e.entry_hash().to_string())
                .collect(),
            root_hash: self.get_root_hash(),
        })
    }

    /// Freshness check: the proof's root is still this chain's root.
    pub fn verify_proof(&self, proof: &ChainProof) -> bool {
        proof.root_hash == self.get_root_hash()
    }

    /// Hash of the most recent entry, or the genesis hash if empty.
    pub fn get_root_hash(&self) -> String {
        self.entries
            .last()
            .map(|e| e.entry_hash().to_string())
            .unwrap_or_else(|| self.genesis_hash.clone())
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<(usize, &LogEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.entry_hash() == hash)
    }

    fn merkle_leaves(&self) -> Vec<Hash32> {
        self.entries
            .iter()
            .map(|e| merkle::leaf_hash(self.algorithm, e.entry_hash().as_bytes()))
            .collect()
    }

    /// Merkle root over all entry hashes.
    pub fn merkle_root(&self) -> String {
        hex::encode(merkle::merkle_root(self.algorithm, &self.merkle_leaves()))
    }

    /// O(log n) inclusion proof for the entry at `index`.
    pub fn get_merkle_proof(&self, index: usize) -> ChainResult<MerkleProof> {
        let entry = self.entries.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;

        let leaves = self.merkle_leaves();
        Ok(MerkleProof {
            algorithm: self.algorithm,
            entry_hash: entry.entry_hash().to_string(),
            leaf_index: index,
            tree_size: leaves.len(),
            audit_path: merkle::audit_path(self.algorithm, &leaves, index)
                .iter()
                .map(hex::encode)
                .collect(),
            root_hash: hex::encode(merkle::merkle_root(self.algorithm, &leaves)),
        })
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn genesis_hash(&self) -> &str {
        &self.genesis_hash
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    #[cfg(test)]
    pub(crate) fn entries_mut(&mut self) -> &mut Vec<LogEntry> {
        &mut self.entries
    }
}
