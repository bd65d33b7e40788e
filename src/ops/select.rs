//! Implementation of `depmap select`: changed files to tests to run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::changeset::Changeset;
use crate::core::index::DependencyIndex;
use crate::ops::vcs;
use crate::select::{select_with_fallback, BuildSystemPatterns, SelectMode};
use crate::util::config::Config;
use crate::util::fs::write_atomic;

/// Default output file of `depmap select`.
pub const DEFAULT_OUTPUT: &str = "tests-to-run.json";

/// Where the changed files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    /// Diff between two revisions of the repository containing `repo`
    Revisions {
        repo: PathBuf,
        from: String,
        to: String,
    },
    /// An explicit list of workspace-relative or absolute paths
    Files(Vec<String>),
}

/// Options for the select command.
#[derive(Debug, Clone)]
pub struct SelectOptions {
    /// Exported dependency map
    pub depmap: PathBuf,
    pub source: ChangeSource,
    pub mode: SelectMode,
    /// Escalate when build-system files changed
    pub fallback: bool,
    /// Where to write the result; `None` skips writing
    pub output: Option<PathBuf>,
}

/// Contents of `tests-to-run.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestsToRun {
    pub mode: String,
    pub tests_to_run: Vec<String>,
    pub changed_files: Vec<String>,
}

/// Turn changed paths into a changeset keyed like `index`.
///
/// VCS paths are relative to the repository root, which need not be the
/// workspace root the index keys are relative to.
fn changeset_for(index: &DependencyIndex, source: &ChangeSource) -> Result<Changeset> {
    match source {
        ChangeSource::Files(files) => Ok(Changeset::from_paths(index.workspace_root(), files)),
        ChangeSource::Revisions { repo, from, to } => {
            let files = vcs::changed_files(repo, from, to)?;
            let changeset = match (index.workspace_root(), vcs::workdir(repo)) {
                (Some(root), Some(workdir)) if workdir != root => {
                    let absolute = files
                        .iter()
                        .map(|f| workdir.join(f).to_string_lossy().into_owned());
                    Changeset::from_paths(Some(root), absolute)
                }
                _ => Changeset::from_paths(None, files),
            };
            Ok(changeset)
        }
    }
}

fn fallback_patterns(config: &Config) -> Result<BuildSystemPatterns> {
    match config.select.fallback_patterns {
        Some(ref patterns) => BuildSystemPatterns::new(patterns),
        None => Ok(BuildSystemPatterns::defaults()),
    }
}

/// Select the targets affected by a change and optionally write them out.
pub fn depmap_select(options: &SelectOptions, config: &Config) -> Result<TestsToRun> {
    let index = DependencyIndex::load(&options.depmap)?;
    select_from_index(&index, options, config)
}

/// Like [`depmap_select`] with an index already loaded.
pub fn select_from_index(
    index: &DependencyIndex,
    options: &SelectOptions,
    config: &Config,
) -> Result<TestsToRun> {
    let changeset = changeset_for(index, &options.source)?;
    if changeset.is_empty() {
        tracing::info!("No changed files detected");
    }

    let patterns = if options.fallback {
        Some(fallback_patterns(config)?)
    } else {
        None
    };
    let selection = select_with_fallback(index, &changeset, &options.mode, patterns.as_ref());

    let result = TestsToRun {
        mode: selection.mode.to_string(),
        tests_to_run: selection.targets.into_iter().collect(),
        changed_files: changeset.iter().map(str::to_string).collect(),
    };

    if let Some(ref output) = options.output {
        write_result(output, &result)?;
        tracing::debug!(
            "Wrote {} tests to run to {}",
            result.tests_to_run.len(),
            output.display()
        );
    }

    Ok(result)
}

fn write_result(path: &Path, result: &TestsToRun) -> Result<()> {
    let mut json = serde_json::to_string_pretty(result)?;
    json.push('\n');
    write_atomic(path, &json)
}
