use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::types::{MatchRecord, MoneylineWindow, RunSummary};

/// Write all records as a pretty-printed JSON list.
///
/// Always writes, even an empty list, so a stale file is never mistaken for
/// the latest run. The list goes to a sibling temp file first and is then
/// renamed over `path`.
pub fn write_records(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records).context("failed to serialize records")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Log every record with a bookmaker line inside `window`. Returns how many.
pub fn report_highlights(records: &[MatchRecord], window: &MoneylineWindow) -> usize {
    let mut count = 0;
    for record in records.iter().filter(|r| window.matches(r)) {
        let lines: Vec<String> = record
            .bookmakers
            .iter()
            .filter(|b| window.contains(b.moneyline))
            .map(|b| format!("{} {:+}", b.name, b.moneyline))
            .collect();
        info!(
            "Opportunity: {} \"{}\" at ${:.2}: {}",
            record.team_on_exchange,
            record.market_title,
            record.price,
            lines.join(", ")
        );
        count += 1;
    }
    count
}

/// Emit the run summary as pretty-printed JSON to stdout.
pub fn report_summary(summary: &RunSummary) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        println!("{json}");
    }
}
