//! Read-only queries over an exported index: `audit` and `optimize`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::core::changeset::Changeset;
use crate::core::index::DependencyIndex;
use crate::select::{select, SelectMode};

/// Every indexed file with its dependent targets.
pub struct Audit<'a> {
    index: &'a DependencyIndex,
}

impl<'a> Audit<'a> {
    pub fn new(index: &'a DependencyIndex) -> Self {
        Audit { index }
    }
}

impl fmt::Display for Audit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (file, targets) in self.index.iter() {
            let joined = targets.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            writeln!(f, "{}: {}", file, joined)?;
        }
        writeln!(f, "Total files: {}", self.index.len())
    }
}

/// Targets to rebuild for a set of changed files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affected {
    pub targets: BTreeSet<String>,
    /// Changed files with no index entry
    pub unknown: Vec<String>,
}

impl fmt::Display for Affected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Affected executables:")?;
        for target in &self.targets {
            writeln!(f, "{}", target)?;
        }
        writeln!(f, "Total affected executables: {}", self.targets.len())
    }
}

/// Targets depending on any of `files`.
///
/// Paths are normalized like changed files from version control, so
/// `./src/a.cpp` and an absolute path under the workspace both match the
/// index key `src/a.cpp`.
pub fn affected_targets<S: AsRef<str>>(index: &DependencyIndex, files: &[S]) -> Affected {
    let changeset = Changeset::from_paths(index.workspace_root(), files);
    let unknown = changeset
        .iter()
        .filter(|f| !index.contains(f))
        .map(str::to_string)
        .collect();
    Affected {
        targets: select(index, &changeset, &SelectMode::Exact),
        unknown,
    }
}

/// Load an index and list its contents.
pub fn audit(depmap: &Path) -> Result<String> {
    let index = DependencyIndex::load(depmap)?;
    Ok(Audit::new(&index).to_string())
}

/// Load an index and compute the targets affected by `files`.
pub fn optimize<S: AsRef<str>>(depmap: &Path, files: &[S]) -> Result<Affected> {
    let index = DependencyIndex::load(depmap)?;
    let affected = affected_targets(&index, files);
    for file in &affected.unknown {
        tracing::debug!("{} is not in the dependency map", file);
    }
    Ok(affected)
}
