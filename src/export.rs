use crate::record::{EvaluationRecord, GroupedResults};
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write grouped results as pretty-printed UTF-8 JSON.
pub fn export_json(results: &GroupedResults, output_path: &Path) -> Result<()> {
    let total: usize = results.values().map(|records| records.len()).sum();
    debug!(
        "Exporting {} records in {} groups to JSON: {}",
        total,
        results.len(),
        output_path.display()
    );

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let json_string = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    file.write_all(json_string.as_bytes())?;
    file.write_all(b"\n")?;

    Ok(())
}

/// Read a results file written by [`export_json`] (or by any producer of the same shape).
pub fn read_results(path: &Path) -> Result<GroupedResults> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results file {}", path.display()))
}

/// Single record as pretty JSON, for `check`.
pub fn record_to_json(record: &EvaluationRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("Failed to serialize record")
}
