pub mod inspect;
pub mod proof;
pub mod run;
pub mod timeline;
pub mod verify;

use anyhow::Context;
use qradle_kernel::storage::{FileSink, MemorySink};
use qradle_kernel::{CoreConfig, HashChain, LogEntry};
use std::path::Path;

pub(crate) fn read_log(path: &Path) -> anyhow::Result<Vec<LogEntry>> {
    FileSink::read_entries(path).with_context(|| format!("failed to read log {}", path.display()))
}

/// Rebuild an in-memory chain from a log file, refusing a corrupted one.
pub(crate) fn load_chain(path: &Path, config: &CoreConfig) -> anyhow::Result<HashChain> {
    let entries = read_log(path)?;
    let chain = HashChain::restore(config.digest, &config.genesis_tag, entries, Box::new(MemorySink::new()))
        .with_context(|| format!("log {} failed integrity verification", path.display()))?;
    Ok(chain)
}

/// First 16 hex chars of a digest, for tables.
pub(crate) fn short_hash(hash: &str) -> String {
    hash.chars().take(16).collect()
}

pub(crate) fn field<'a>(entry: &'a LogEntry, name: &str) -> &'a str {
    entry.data().get(name).and_then(|v| v.as_str()).unwrap_or("")
}
