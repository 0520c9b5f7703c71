// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration for the execution core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version-tagged constant hashed once to seed every chain.
pub const DEFAULT_GENESIS_TAG: &str = "qradle-genesis-v1";

/// Default retention cap for checkpoints before automatic pruning kicks in.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 1000;

/// Digest function used for entry hashes, state hashes and output fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            other => Err(format!("unknown digest algorithm: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub digest: DigestAlgorithm,
    pub genesis_tag: String,
    /// `None` disables automatic pruning.
    pub max_checkpoints: Option<usize>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            digest: DigestAlgorithm::Sha256,
            genesis_tag: DEFAULT_GENESIS_TAG.to_string(),
            max_checkpoints: Some(DEFAULT_MAX_CHECKPOINTS),
        }
    }
}

impl CoreConfig {
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_genesis_tag(mut self, tag: impl Into<String>) -> Self {
        self.genesis_tag = tag.into();
        self
    }

    pub fn with_max_checkpoints(mut self, max: Option<usize>) -> Self {
        self.max_checkpoints = max;
        self
    }
}
