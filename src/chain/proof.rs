// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Linear chain proofs.
//!
//! The chain is a linear hash chain, not a tree. A proof for entry `i` is the
//! suffix of entry hashes after `i` plus the root the chain had when the proof
//! was taken. Verification only establishes that the claimed root is still the
//! live root (freshness), so proof length grows with the remaining chain.
//! For positional inclusion proofs see [`super::merkle`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProof {
    pub entry_hash: String,
    pub chain_position: usize,
    /// Hash of every later entry, oldest first.
    pub proof_path: Vec<String>,
    /// Tail hash of the chain when the proof was taken.
    pub root_hash: String,
}

impl ChainProof {
    /// Replays the suffix: the last hash on the path (or the entry itself if
    /// the path is empty) must be the claimed root.
    pub fn is_self_consistent(&self) -> bool {
        let tail = self.proof_path.last().unwrap_or(&self.entry_hash);
        *tail == self.root_hash
    }
}
