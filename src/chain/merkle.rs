// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Merkle Inclusion Proofs
//!
//! Second proof kind over the chain's entries. Each entry hash becomes a
//! domain-separated leaf (`0x00` prefix), interior nodes hash their two
//! children behind a `0x01` prefix, and a tree of `n` leaves splits at the
//! largest power of two strictly below `n`.
//!
//! An inclusion proof carries one sibling per level and checks against the
//! tree root alone.

use serde::{Deserialize, Serialize};

use crate::canonical::{digest, Hash32};
use crate::config::DigestAlgorithm;

pub fn leaf_hash(algorithm: DigestAlgorithm, data: &[u8]) -> Hash32 {
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(0u8);
    buf.extend_from_slice(data);
    digest(algorithm, &buf)
}

pub fn node_hash(algorithm: DigestAlgorithm, left: &Hash32, right: &Hash32) -> Hash32 {
    let mut buf = [0u8; 65];
    buf[0] = 1;
    buf[1..33].copy_from_slice(left);
    buf[33..65].copy_from_slice(right);
    digest(algorithm, &buf)
}

fn split_point(n: usize) -> usize {
    debug_assert!(n > 1);
    1usize << (usize::BITS - 1 - (n - 1).leading_zeros())
}

/// Root over `leaves`. The empty tree hashes the empty string.
pub fn merkle_root(algorithm: DigestAlgorithm, leaves: &[Hash32]) -> Hash32 {
    match leaves.len() {
        0 => digest(algorithm, b""),
        1 => leaves[0],
        n => {
            let k = split_point(n);
            let left = merkle_root(algorithm, &leaves[..k]);
            let right = merkle_root(algorithm, &leaves[k..]);
            node_hash(algorithm, &left, &right)
        }
    }
}

/// Audit path for `index`, deepest sibling first.
pub fn audit_path(algorithm: DigestAlgorithm, leaves: &[Hash32], index: usize) -> Vec<Hash32> {
    if leaves.len() <= 1 {
        return Vec::new();
    }
    let k = split_point(leaves.len());
    if index < k {
        let mut path = audit_path(algorithm, &leaves[..k], index);
        path.push(merkle_root(algorithm, &leaves[k..]));
        path
    } else {
        let mut path = audit_path(algorithm, &leaves[k..], index - k);
        path.push(merkle_root(algorithm, &leaves[..k]));
        path
    }
}

/// Fold an audit path back up to a root. `None` if the path does not fit a
/// tree of `tree_size` leaves.
pub fn root_from_path(
    algorithm: DigestAlgorithm,
    leaf: &Hash32,
    index: usize,
    tree_size: usize,
    path: &[Hash32],
) -> Option<Hash32> {
    if tree_size == 0 || index >= tree_size {
        return None;
    }
    let (root, consumed) = fold_subtree(algorithm, leaf, index, tree_size, path)?;
    (consumed == path.len()).then_some(root)
}

// Walks the same split as `audit_path`, so the deepest subtree consumes the
// front of the path. Returns the subtree root and how many siblings it used.
fn fold_subtree(
    algorithm: DigestAlgorithm,
    leaf: &Hash32,
    index: usize,
    size: usize,
    path: &[Hash32],
) -> Option<(Hash32, usize)> {
    if size == 1 {
        return Some((*leaf, 0));
    }
    let k = split_point(size);
    if index < k {
        let (left, used) = fold_subtree(algorithm, leaf, index, k, path)?;
        let right = path.get(used)?;
        Some((node_hash(algorithm, &left, right), used + 1))
    } else {
        let (right, used) = fold_subtree(algorithm, leaf, index - k, size - k, path)?;
        let left = path.get(used)?;
        Some((node_hash(algorithm, left, &right), used + 1))
    }
}

/// Self-contained inclusion proof for one chain entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub algorithm: DigestAlgorithm,
    pub entry_hash: String,
    pub leaf_index: usize,
    pub tree_size: usize,
    pub audit_path: Vec<String>,
    pub root_hash: String,
}

impl MerkleProof {
    /// Checks the entry is included at `leaf_index` under `root_hash`.
    pub fn verify(&self) -> bool {
        let Some(path) = decode_all(&self.audit_path) else {
            return false;
        };
        let Some(root) = decode(&self.root_hash) else {
            return false;
        };
        let leaf = leaf_hash(self.algorithm, self.entry_hash.as_bytes());
        root_from_path(self.algorithm, &leaf, self.leaf_index, self.tree_size, &path)
            .is_some_and(|computed| computed == root)
    }
}

fn decode(hex_str: &str) -> Option<Hash32> {
    let bytes = hex::decode(hex_str).ok()?;
    bytes.try_into().ok()
}

fn decode_all(hashes: &[String]) -> Option<Vec<Hash32>> {
    hashes.iter().map(|h| decode(h)).collect()
}
