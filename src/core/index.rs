//! The inverted file → target dependency index.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Mapping from file path to the names of the targets that depend on it.
///
/// Files and target sets are kept sorted so every export is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyIndex {
    workspace_root: Option<PathBuf>,
    files: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyIndex {
    /// Create an empty index.
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        DependencyIndex {
            workspace_root,
            files: BTreeMap::new(),
        }
    }

    /// Record that `target` depends on `file`.
    pub fn insert(&mut self, file: impl Into<String>, target: impl Into<String>) {
        self.files
            .entry(file.into())
            .or_default()
            .insert(target.into());
    }

    /// Targets depending on `file`, if it is indexed.
    pub fn get(&self, file: &str) -> Option<&BTreeSet<String>> {
        self.files.get(file)
    }

    /// Whether `file` is indexed.
    pub fn contains(&self, file: &str) -> bool {
        self.files.contains_key(file)
    }

    /// All `(file, targets)` entries, sorted by file.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.files.iter()
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the index has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Project root the keys are relative to, when known.
    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    /// Union of every target set.
    pub fn all_targets(&self) -> BTreeSet<&str> {
        self.files
            .values()
            .flat_map(|targets| targets.iter().map(String::as_str))
            .collect()
    }

    /// Reverse view: target to the files it depends on.
    pub fn target_to_files(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut out: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (file, targets) in &self.files {
            for target in targets {
                out.entry(target.as_str()).or_default().insert(file.as_str());
            }
        }
        out
    }

    /// Files depended on by more than one target, most shared first.
    pub fn shared_files(&self) -> Vec<(&str, usize)> {
        let mut shared: Vec<_> = self
            .files
            .iter()
            .filter(|(_, targets)| targets.len() > 1)
            .map(|(file, targets)| (file.as_str(), targets.len()))
            .collect();
        shared.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        shared
    }

    /// Serialize into the exported JSON document.
    pub fn to_document(&self, statistics: IndexStatistics) -> IndexDocument {
        IndexDocument {
            workspace_root: self.workspace_root.clone(),
            file_to_executables: self
                .files
                .iter()
                .map(|(f, t)| (f.clone(), t.iter().cloned().collect()))
                .collect(),
            executable_to_files: self
                .target_to_files()
                .into_iter()
                .map(|(t, f)| (t.to_string(), f.into_iter().map(str::to_string).collect()))
                .collect(),
            statistics: Some(statistics),
        }
    }

    /// Load an exported index.
    ///
    /// Accepts the full document written by `depmap parse` as well as a bare
    /// `{ "file": ["target", ...] }` map.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("dependency map not found: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("failed to parse dependency map: {}", path.display()))
    }

    /// Parse an exported index from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let document: IndexDocument = if value.get("file_to_executables").is_some() {
            serde_json::from_value(value)?
        } else {
            IndexDocument {
                workspace_root: None,
                file_to_executables: serde_json::from_value(value)?,
                executable_to_files: BTreeMap::new(),
                statistics: None,
            }
        };

        let mut index = DependencyIndex::new(document.workspace_root);
        for (file, targets) in document.file_to_executables {
            let entry = index.files.entry(file).or_default();
            entry.extend(targets);
        }
        Ok(index)
    }
}

/// Counters recorded alongside the exported index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total_files: usize,
    pub total_executables: usize,
    pub total_object_files: usize,
    pub files_with_multiple_executables: usize,
    #[serde(default)]
    pub failed_objects: usize,
    #[serde(default)]
    pub skipped_records: usize,
}

/// On-disk JSON form of the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    pub file_to_executables: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub executable_to_files: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<IndexStatistics>,
}
