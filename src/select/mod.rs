//! Changeset → affected targets.
//!
//! Files absent from the index affect nothing, and an empty changeset
//! selects nothing; neither is an error.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};

use crate::core::changeset::Changeset;
use crate::core::index::DependencyIndex;

/// Default globs of build-system files that invalidate the index.
pub const DEFAULT_FALLBACK_PATTERNS: &[&str] = &["**/CMakeLists.txt", "**/*.cmake"];

/// How the changeset is turned into a target set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectMode {
    /// Targets depending on at least one changed file
    Exact,
    /// Every target in the index, regardless of the changeset
    All,
    /// Like `Exact`, restricted to targets named like tests
    TestPrefix(String),
}

impl SelectMode {
    /// Mode used when the changeset can't be trusted to be complete.
    fn escalated(&self) -> SelectMode {
        match self {
            SelectMode::Exact | SelectMode::All => SelectMode::All,
            SelectMode::TestPrefix(prefix) => SelectMode::TestPrefix(prefix.clone()),
        }
    }
}

impl fmt::Display for SelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectMode::Exact => write!(f, "exact"),
            SelectMode::All => write!(f, "all"),
            SelectMode::TestPrefix(prefix) => write!(f, "test-prefix({})", prefix),
        }
    }
}

/// Whether `target` follows the test naming convention.
///
/// Only the last path component is checked, so `bin/test_util` matches
/// the prefix `test_`.
pub fn matches_test_prefix(target: &str, prefix: &str) -> bool {
    let name = target.rsplit(['/', '\\']).next().unwrap_or(target);
    name.starts_with(prefix)
}

/// Targets affected by `changeset` under `mode`.
pub fn select(index: &DependencyIndex, changeset: &Changeset, mode: &SelectMode) -> BTreeSet<String> {
    match mode {
        SelectMode::All => index.all_targets().into_iter().map(str::to_string).collect(),
        SelectMode::Exact => affected(index, changeset).collect(),
        SelectMode::TestPrefix(prefix) => affected(index, changeset)
            .filter(|t| matches_test_prefix(t, prefix))
            .collect(),
    }
}

fn affected<'a>(
    index: &'a DependencyIndex,
    changeset: &'a Changeset,
) -> impl Iterator<Item = String> + 'a {
    changeset
        .iter()
        .filter_map(|file| index.get(file))
        .flatten()
        .cloned()
}

/// Compiled build-system file patterns.
#[derive(Debug, Clone)]
pub struct BuildSystemPatterns {
    patterns: Vec<Pattern>,
}

impl BuildSystemPatterns {
    /// Compile glob patterns; an invalid pattern is an error.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).with_context(|| format!("invalid fallback pattern `{}`", p))
            })
            .collect::<Result<_>>()?;
        Ok(BuildSystemPatterns { patterns })
    }

    /// The built-in CMake patterns.
    pub fn defaults() -> Self {
        BuildSystemPatterns {
            patterns: DEFAULT_FALLBACK_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }

    /// Whether `file` is a build-system file.
    pub fn matches(&self, file: &str) -> bool {
        let options = MatchOptions {
            require_literal_separator: false,
            ..MatchOptions::new()
        };
        // `**/x` needs at least one directory in front of `x`; try the bare
        // name too so a top-level CMakeLists.txt still counts.
        let name = Path::new(file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file);
        self.patterns.iter().any(|p| {
            p.matches_with(file, options)
                || p.matches_with(&format!("./{}", name), options)
        })
    }

    /// Changed files that are build-system files.
    pub fn touched<'c>(&self, changeset: &'c Changeset) -> Vec<&'c str> {
        changeset.iter().filter(|f| self.matches(f)).collect()
    }
}

/// Result of a selection with build-system fallback applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Mode actually applied
    pub mode: SelectMode,
    pub targets: BTreeSet<String>,
    /// Build-system files that forced the escalation
    pub escalated_by: Vec<String>,
}

/// Select targets, escalating to a broader mode when build-system files
/// changed. `Exact` becomes `All`; `TestPrefix(p)` selects every target
/// matching `p`.
pub fn select_with_fallback(
    index: &DependencyIndex,
    changeset: &Changeset,
    mode: &SelectMode,
    fallback: Option<&BuildSystemPatterns>,
) -> Selection {
    let touched: Vec<String> = fallback
        .map(|patterns| patterns.touched(changeset))
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect();

    if touched.is_empty() || *mode == SelectMode::All {
        return Selection {
            mode: mode.clone(),
            targets: select(index, changeset, mode),
            escalated_by: Vec::new(),
        };
    }

    tracing::warn!(
        "Build system files changed ({}); selecting all matching targets",
        touched.join(", ")
    );

    let mode = mode.escalated();
    let targets = match mode {
        SelectMode::TestPrefix(ref prefix) => index
            .all_targets()
            .into_iter()
            .filter(|t| matches_test_prefix(t, prefix))
            .map(str::to_string)
            .collect(),
        _ => select(index, changeset, &mode),
    };

    Selection {
        mode,
        targets,
        escalated_by: touched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn index() -> DependencyIndex {
        let mut index = DependencyIndex::new(Some(PathBuf::from("/ws")));
        index.insert("src/main.cpp", "bin/app");
        index.insert("src/util.cpp", "bin/app");
        index.insert("src/util.cpp", "bin/test_util");
        index.insert("include/util.h", "bin/app");
        index.insert("include/util.h", "bin/test_util");
        index.insert("tests/test_io.cpp", "bin/test_io");
        index
    }

    fn changes(files: &[&str]) -> Changeset {
        Changeset::from_paths(Some(Path::new("/ws")), files)
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_exact_empty_changeset() {
        assert!(select(&index(), &changes(&[]), &SelectMode::Exact).is_empty());
    }

    #[test]
    fn test_exact_single_file_equals_lookup() {
        let index = index();
        for file in ["src/main.cpp", "include/util.h", "tests/test_io.cpp"] {
            let selected = select(&index, &changes(&[file]), &SelectMode::Exact);
            assert_eq!(&selected, index.get(file).unwrap());
        }
    }

    #[test]
    fn test_exact_unknown_file_selects_nothing() {
        let selected = select(&index(), &changes(&["README.md"]), &SelectMode::Exact);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_shared_header_selects_both() {
        let selected = select(&index(), &changes(&["include/util.h"]), &SelectMode::Exact);
        assert_eq!(names(&selected), vec!["bin/app", "bin/test_util"]);
    }

    #[test]
    fn test_all_ignores_changeset() {
        let index = index();
        let expected: BTreeSet<String> =
            index.all_targets().into_iter().map(str::to_string).collect();
        assert_eq!(select(&index, &changes(&[]), &SelectMode::All), expected);
        assert_eq!(
            select(&index, &changes(&["README.md"]), &SelectMode::All),
            expected
        );
    }

    #[test]
    fn test_test_prefix_restricts() {
        let mode = SelectMode::TestPrefix("test_".to_string());
        let selected = select(&index(), &changes(&["src/util.cpp", "src/main.cpp"]), &mode);
        assert_eq!(names(&selected), vec!["bin/test_util"]);
    }

    #[test]
    fn test_matches_test_prefix() {
        assert!(matches_test_prefix("bin/test_util", "test_"));
        assert!(matches_test_prefix("test_util", "test_"));
        assert!(!matches_test_prefix("bin/app", "test_"));
        assert!(!matches_test_prefix("test_dir/app", "test_"));
    }

    #[test]
    fn test_build_system_patterns() {
        let patterns = BuildSystemPatterns::defaults();
        assert!(patterns.matches("CMakeLists.txt"));
        assert!(patterns.matches("src/CMakeLists.txt"));
        assert!(patterns.matches("cmake/Warnings.cmake"));
        assert!(!patterns.matches("src/main.cpp"));

        assert!(BuildSystemPatterns::new(["[unclosed"]).is_err());
    }

    #[test]
    fn test_fallback_escalates_exact_to_all() {
        let index = index();
        let patterns = BuildSystemPatterns::defaults();
        let selection = select_with_fallback(
            &index,
            &changes(&["CMakeLists.txt", "src/main.cpp"]),
            &SelectMode::Exact,
            Some(&patterns),
        );
        assert_eq!(selection.mode, SelectMode::All);
        assert_eq!(selection.targets.len(), 3);
        assert_eq!(selection.escalated_by, vec!["CMakeLists.txt"]);
    }

    #[test]
    fn test_fallback_keeps_test_prefix() {
        let index = index();
        let patterns = BuildSystemPatterns::defaults();
        let mode = SelectMode::TestPrefix("test_".to_string());
        let selection =
            select_with_fallback(&index, &changes(&["cmake/deps.cmake"]), &mode, Some(&patterns));
        assert_eq!(selection.mode, mode);
        assert_eq!(names(&selection.targets), vec!["bin/test_io", "bin/test_util"]);
    }

    #[test]
    fn test_no_fallback_without_patterns() {
        let selection = select_with_fallback(
            &index(),
            &changes(&["CMakeLists.txt"]),
            &SelectMode::Exact,
            None,
        );
        assert_eq!(selection.mode, SelectMode::Exact);
        assert!(selection.targets.is_empty());
        assert!(selection.escalated_by.is_empty());
    }
}
