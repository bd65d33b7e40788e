//! CSV and JSON export of the dependency index.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::index::{DependencyIndex, IndexStatistics};
use crate::util::fs::write_atomic;

/// File name of the tabular export.
pub const CSV_FILE_NAME: &str = "file_target_mapping.csv";

/// File name of the structured export.
pub const JSON_FILE_NAME: &str = "dependency_mapping.json";

/// Paths written by [`export_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render the index as CSV: one row per file, targets joined by `;`.
pub fn to_csv(index: &DependencyIndex) -> String {
    let mut out = String::from("source_file,executables\n");
    for (file, targets) in index.iter() {
        let joined = targets
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        out.push_str(&quote(file));
        out.push(',');
        out.push_str(&quote(&joined));
        out.push('\n');
    }
    out
}

/// Render the index and its statistics as pretty-printed JSON.
pub fn to_json(index: &DependencyIndex, statistics: IndexStatistics) -> Result<String> {
    let document = index.to_document(statistics);
    let mut json =
        serde_json::to_string_pretty(&document).context("failed to serialize dependency map")?;
    json.push('\n');
    Ok(json)
}

/// Write both exports into `output_dir`.
pub fn export_index(
    index: &DependencyIndex,
    statistics: IndexStatistics,
    output_dir: &Path,
) -> Result<ExportedFiles> {
    let files = ExportedFiles {
        csv: output_dir.join(CSV_FILE_NAME),
        json: output_dir.join(JSON_FILE_NAME),
    };

    write_atomic(&files.csv, &to_csv(index))?;
    tracing::info!("Exported CSV mapping to {}", files.csv.display());

    write_atomic(&files.json, &to_json(index, statistics)?)?;
    tracing::info!("Exported JSON mapping to {}", files.json.display());

    Ok(files)
}
