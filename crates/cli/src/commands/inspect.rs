use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use qradle_kernel::CoreConfig;
use std::path::Path;

use super::{read_log, short_hash};

pub fn run(log_path: &Path, config: &CoreConfig) -> anyhow::Result<()> {
    let entries = read_log(log_path)?;

    println!("\nQradle Log Report");
    println!("-----------------");
    println!("File:     {}", log_path.display());
    println!("Digest:   {}", config.digest);
    println!("Entries:  {}\n", entries.len());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Timestamp", "Event", "Contract", "Entry Hash", "Hash Check"]);

    for (index, entry) in entries.iter().enumerate() {
        let hash_ok = entry.recompute_hash(config.digest) == entry.entry_hash();
        table.add_row(vec![
            index.to_string(),
            entry.timestamp().to_string(),
            entry.event_type().unwrap_or("-").to_string(),
            entry.contract_id().unwrap_or("-").to_string(),
            short_hash(entry.entry_hash()),
            if hash_ok { "OK" } else { "MISMATCH" }.to_string(),
        ]);
    }

    println!("{table}\n");

    Ok(())
}
