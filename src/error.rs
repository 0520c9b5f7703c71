// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.
//!
//! Fatal invariant violations are not here: they live in
//! [`crate::invariants::InvariantViolation`] and travel inside
//! [`crate::engine::Outcome::Halted`], never through these enums.

use thiserror::Error;

use crate::invariants::InvariantViolation;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid header")]
    InvalidHeader,

    #[error("Checksum mismatch at record {record}: expected {expected:08x}, found {found:08x}")]
    ChecksumMismatch { record: u64, expected: u32, found: u32 },

    #[error("Truncated record at offset {0}")]
    Truncated(u64),
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Index {index} out of range for chain of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Chain corrupted at entry {0}")]
    Corrupted(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    #[error("Checkpoint {id} failed integrity check: stored {stored}, computed {computed}")]
    IntegrityFailure {
        id: String,
        stored: String,
        computed: String,
    },

    #[error("Checkpoint id already exists: {0}")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Contract validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Execution halted: {0}")]
    Halted(InvariantViolation),
}

pub type ChainResult<T> = std::result::Result<T, ChainError>;
pub type StorageResult<T> = std::result::Result<T, StorageError>;
