// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chain log entries.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::hash_value;
use crate::config::DigestAlgorithm;
use crate::types::Payload;

/// One linked, content-addressed node of the hash chain.
///
/// Immutable once appended: the chain only hands out shared references or
/// owned clones, so a caller can never rewrite a committed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    data: Payload,
    timestamp: String,
    previous_hash: String,
    entry_hash: String,
}

impl LogEntry {
    pub(crate) fn seal(
        algorithm: DigestAlgorithm,
        data: Payload,
        timestamp: String,
        previous_hash: String,
    ) -> Self {
        let entry_hash = compute_entry_hash(algorithm, &data, &timestamp, &previous_hash);
        Self {
            data,
            timestamp,
            previous_hash,
            entry_hash,
        }
    }

    /// Rebuild an entry from persisted parts. The stored hash is kept as-is;
    /// it is only trusted after the chain re-verifies it.
    pub(crate) fn from_parts(
        data: Payload,
        timestamp: String,
        previous_hash: String,
        entry_hash: String,
    ) -> Self {
        Self {
            data,
            timestamp,
            previous_hash,
            entry_hash,
        }
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn entry_hash(&self) -> &str {
        &self.entry_hash
    }

    /// The `event_type` field of the entry data, if any.
    pub fn event_type(&self) -> Option<&str> {
        self.data.get("event_type").and_then(Value::as_str)
    }

    /// The `contract_id` field of the entry data, if any.
    pub fn contract_id(&self) -> Option<&str> {
        self.data.get("contract_id").and_then(Value::as_str)
    }

    /// Recompute the hash from the entry's current contents.
    pub fn recompute_hash(&self, algorithm: DigestAlgorithm) -> String {
        compute_entry_hash(algorithm, &self.data, &self.timestamp, &self.previous_hash)
    }

    #[cfg(test)]
    pub(crate) fn data_mut(&mut self) -> &mut Payload {
        &mut self.data
    }

    #[cfg(test)]
    pub(crate) fn reseal(&mut self, algorithm: DigestAlgorithm) {
        self.entry_hash = self.recompute_hash(algorithm);
    }
}

/// Digest of `(data, timestamp, previous_hash)` in canonical form.
pub fn compute_entry_hash(
    algorithm: DigestAlgorithm,
    data: &Payload,
    timestamp: &str,
    previous_hash: &str,
) -> String {
    let body = json!({
        "data": data,
        "timestamp": timestamp,
        "previous_hash": previous_hash,
    });
    hash_value(algorithm, &body)
}
