// Roster export for downstream scoring.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use snakedraft_core::draft::RosterExport;

/// File name for an export written at `at`:
/// `draft_export_YYYYMMDD_HHMMSS.json`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    at.format("draft_export_%Y%m%d_%H%M%S.json").to_string()
}

/// Write `rosters` as pretty JSON into `dir`, creating it if needed.
/// Returns the written path.
pub fn write_export(dir: &Path, rosters: &[RosterExport], at: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(at));
    let json = serde_json::to_string_pretty(rosters).context("failed to serialize export")?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write export {}", path.display()))?;
    info!("Exported {} rosters to {}", rosters.len(), path.display());
    Ok(path)
}
