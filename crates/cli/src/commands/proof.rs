use qradle_kernel::CoreConfig;
use std::path::Path;

use super::load_chain;

/// Print a proof for the entry at `index` as JSON.
///
/// The linear proof is only fresh against the log as it is now; the Merkle
/// proof is self-contained and can be checked without the log.
pub fn run(log_path: &Path, config: &CoreConfig, index: usize, merkle: bool) -> anyhow::Result<()> {
    let chain = load_chain(log_path, config)?;

    if merkle {
        let proof = chain.get_merkle_proof(index)?;
        println!("{}", serde_json::to_string_pretty(&proof)?);
        println!("\nInclusion: {}", if proof.verify() { "VALID" } else { "INVALID" });
    } else {
        let proof = chain.get_proof(index)?;
        println!("{}", serde_json::to_string_pretty(&proof)?);
        println!("\nFreshness: {}", if chain.verify_proof(&proof) { "VALID" } else { "STALE" });
    }

    Ok(())
}
