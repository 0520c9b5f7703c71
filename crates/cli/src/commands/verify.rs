use qradle_kernel::chain::ChainViolation;
use qradle_kernel::storage::MemorySink;
use qradle_kernel::{CoreConfig, HashChain};
use std::path::Path;

use super::read_log;

/// Exits with an error if any record fails its hash or link check.
pub fn run(log_path: &Path, config: &CoreConfig) -> anyhow::Result<()> {
    let entries = read_log(log_path)?;
    let count = entries.len();

    let chain = HashChain::restore_unverified(config.digest, &config.genesis_tag, entries, Box::new(MemorySink::new()));

    match chain.verify_chain_detailed() {
        Ok(()) => {
            println!("\n✅ VERIFIED\n");
            println!("Entries:       {}", count);
            println!("Root Hash:     {}", chain.get_root_hash());
            println!("Merkle Root:   {}", chain.merkle_root());
            println!("Digest:        {}\n", config.digest);
            Ok(())
        }
        Err(violation) => {
            println!("\n❌ CORRUPTED\n");
            match violation {
                ChainViolation::HashMismatch { index } => {
                    println!("Entry {} does not match its recorded hash", index)
                }
                ChainViolation::BrokenLink { index } => {
                    println!("Entry {} does not link to its predecessor", index)
                }
            }
            anyhow::bail!("chain integrity check failed at entry {}", violation.index())
        }
    }
}
