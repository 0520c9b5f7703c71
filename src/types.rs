// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Free-form, schema-less key/value payload.
///
/// Used for log entry data, contract parameters, checkpoint state and metadata.
/// Hashing never depends on the map's iteration order; see [`crate::canonical`].
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Declared safety level of a contract, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    Routine,
    Elevated,
    Sensitive,
    Critical,
    Existential,
}

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 5] = [
        SafetyLevel::Routine,
        SafetyLevel::Elevated,
        SafetyLevel::Sensitive,
        SafetyLevel::Critical,
        SafetyLevel::Existential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Routine => "ROUTINE",
            SafetyLevel::Elevated => "ELEVATED",
            SafetyLevel::Sensitive => "SENSITIVE",
            SafetyLevel::Critical => "CRITICAL",
            SafetyLevel::Existential => "EXISTENTIAL",
        }
    }

    /// Levels at or above SENSITIVE need explicit human authorization.
    pub fn requires_human_oversight(&self) -> bool {
        *self >= SafetyLevel::Sensitive
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        SafetyLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| format!("unrecognized safety level: {:?}", s))
    }
}
