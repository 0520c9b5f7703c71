use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use qradle_kernel::CoreConfig;
use std::path::Path;

use super::{field, load_chain, short_hash};

pub fn run(log_path: &Path, config: &CoreConfig) -> anyhow::Result<()> {
    let chain = load_chain(log_path, config)?;
    let entries = chain.entries();

    // Append order is authoritative; timestamps are informational.
    let is_monotonic = entries.windows(2).all(|w| {
        match (
            chrono::DateTime::parse_from_rfc3339(w[0].timestamp()),
            chrono::DateTime::parse_from_rfc3339(w[1].timestamp()),
        ) {
            (Ok(a), Ok(b)) => a <= b,
            _ => false,
        }
    });
    if !is_monotonic {
        println!("\n⚠️  WARNING: Entry timestamps are not monotonic. Showing append order.\n");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Timestamp", "Event", "Contract", "Details"]);

    for (index, entry) in entries.iter().enumerate() {
        let details = match entry.event_type() {
            Some("execution_started") => format!("level {}", field(entry, "safety_level")),
            Some("execution_completed") => format!("output {}", short_hash(field(entry, "output_hash"))),
            Some("execution_failed") => field(entry, "error").to_string(),
            Some("invariant_violation") => {
                format!("{}: {}", field(entry, "invariant"), field(entry, "message"))
            }
            Some("rollback_executed") => format!("to {}", field(entry, "checkpoint_id")),
            _ => String::new(),
        };

        table.add_row(vec![
            index.to_string(),
            entry.timestamp().to_string(),
            entry.event_type().unwrap_or("-").to_string(),
            entry.contract_id().unwrap_or("-").to_string(),
            details,
        ]);
    }

    println!("\nExecution Timeline\n");
    println!("{table}\n");

    Ok(())
}
