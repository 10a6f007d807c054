//! Record retrieval by ID for the `get` command.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::models::ProcessedContent;
use crate::store::{ContentStore, SqliteStore};

/// Load one record, failing when it does not exist.
pub async fn get_record(config: &Config, id: i64) -> Result<ProcessedContent> {
    let store = SqliteStore::open(config).await?;
    let record = store.get(id).await;
    store.close().await;

    match record? {
        Some(record) => Ok(record),
        None => bail!("processed content not found: {}", id),
    }
}

/// Print a record the way `process-url` and `process-file` do.
pub fn print_record(record: &ProcessedContent) {
    println!("--- Processed content ---");
    println!("id:          {}", record.id);
    println!("source_type: {}", record.source_kind);
    println!("source:      {}", record.source_value);
    println!("created_at:  {}", format_ts_iso(record));
    println!();

    println!("--- Summary ---");
    println!("{}", record.summary.as_deref().unwrap_or("(none)"));
    println!();

    println!("--- Text ({} lines) ---", record.original_text.lines().count());
    println!("{}", record.original_text);
}

pub async fn run_get(config: &Config, id: i64) -> Result<()> {
    let record = get_record(config, id).await?;
    print_record(&record);
    Ok(())
}

fn format_ts_iso(record: &ProcessedContent) -> String {
    record.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
