// Catalog loading from the roster file (JSON array or CSV).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use snakedraft_core::{CandidateItem, Catalog, Category};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("catalog {path} contains no draftable items")]
    Empty { path: String },
}

// ---------------------------------------------------------------------------
// Raw record
// ---------------------------------------------------------------------------

/// One roster record as written by the roster fetch job. Missing optional
/// columns default to empty strings.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    jersey: String,
    position: String,
    #[serde(default)]
    headshot: String,
    team: String,
    #[serde(default)]
    team_name: String,
}

impl RawPlayer {
    /// Convert into a candidate, or `None` when the row has no name, no
    /// team or a position outside every category.
    fn into_candidate(self) -> Option<CandidateItem> {
        let name = self.name.trim();
        let team = self.team.trim();
        if name.is_empty() || team.is_empty() {
            warn!("skipping roster row with missing name or team: {:?}", self);
            return None;
        }
        let Some(category) = Category::from_str_pos(&self.position) else {
            debug!("skipping {} ({}): position '{}' not draftable", name, team, self.position);
            return None;
        };
        let full_name = match self.full_name.trim() {
            "" => name.to_string(),
            full => full.to_string(),
        };
        Some(CandidateItem {
            display_name: name.to_string(),
            full_name,
            jersey: self.jersey.trim().to_string(),
            category,
            image_ref: self.headshot.trim().to_string(),
            group_name: self.team_name.trim().to_string(),
            group_label: team.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_csv_from_reader<R: Read>(rdr: R) -> Result<Vec<CandidateItem>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut items = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => items.extend(raw.into_candidate()),
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(items)
}

fn load_json_from_reader<R: Read>(rdr: R) -> Result<Vec<CandidateItem>, serde_json::Error> {
    // Decode rows one by one so a single bad record does not reject the file.
    let rows: Vec<serde_json::Value> = serde_json::from_reader(rdr)?;
    let mut items = Vec::new();
    for row in rows {
        match serde_json::from_value::<RawPlayer>(row) {
            Ok(raw) => items.extend(raw.into_candidate()),
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the catalog from `path`. Files ending in `.csv` are read as CSV,
/// everything else as a JSON array.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let path_display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| CatalogError::Io {
        path: path_display.clone(),
        source: e,
    })?;

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let items = if is_csv {
        load_csv_from_reader(file).map_err(|e| CatalogError::Csv {
            path: path_display.clone(),
            source: e,
        })?
    } else {
        load_json_from_reader(file).map_err(|e| CatalogError::Json {
            path: path_display.clone(),
            source: e,
        })?
    };

    if items.is_empty() {
        return Err(CatalogError::Empty { path: path_display });
    }
    info!("Loaded {} draftable items from {}", items.len(), path_display);
    Ok(Catalog::new(items))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
