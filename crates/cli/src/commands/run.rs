use anyhow::Context;
use qradle_kernel::{ContractError, ContractLayer, CoreConfig, ExecutionCore, Payload};
use serde_json::{json, Value};
use std::path::Path;

/// Sum every parameter. Integers stay integers unless a float is present.
pub fn sum(parameters: &Payload) -> Result<Value, String> {
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut all_ints = true;

    for (name, value) in parameters {
        let Value::Number(n) = value else {
            return Err(format!("parameter {} is not numeric", name));
        };
        match n.as_i64() {
            Some(i) if all_ints => {
                int_total = int_total
                    .checked_add(i)
                    .ok_or_else(|| "integer overflow".to_string())?;
            }
            _ => all_ints = false,
        }
        float_total += n.as_f64().unwrap_or(0.0);
    }

    Ok(if all_ints { json!(int_total) } else { json!(float_total) })
}

/// Execute the contract at `contract_path` and append its lifecycle to `log_path`.
pub fn run(contract_path: &Path, log_path: &Path, config: &CoreConfig, checkpoint: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(contract_path)
        .with_context(|| format!("failed to read contract {}", contract_path.display()))?;
    let contract: Value = serde_json::from_str(&raw).context("contract is not valid JSON")?;

    match contract.get("contract_type").and_then(Value::as_str) {
        Some("sum") | None => {}
        Some(other) => anyhow::bail!("unsupported contract_type: {} (built-in: sum)", other),
    }

    let core = ExecutionCore::open_persistent(config.clone(), log_path)?;
    let mut layer = ContractLayer::new(core);

    match layer.execute(&contract, sum, checkpoint) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            let stats = layer.get_stats();
            println!("\nChain length: {}  Root: {}", stats.chain_length, stats.chain_root_hash);
            Ok(())
        }
        Err(ContractError::Validation(errors)) => {
            for error in &errors {
                println!("  - {}", error);
            }
            anyhow::bail!("contract rejected with {} error(s)", errors.len())
        }
        Err(e @ ContractError::Halted(_)) => Err(e.into()),
    }
}
