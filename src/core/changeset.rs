//! The set of files presented to the selector.

use std::collections::BTreeSet;
use std::path::Path;

use crate::core::paths::changed_file_key;

/// Unordered set of changed file paths, normalized to index keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    files: BTreeSet<String>,
}

impl Changeset {
    /// Build a changeset from raw paths; duplicates collapse.
    pub fn from_paths<I, S>(workspace_root: Option<&Path>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = paths
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| changed_file_key(workspace_root, &p))
            .collect();
        Changeset { files }
    }

    /// Changed files, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Number of distinct changed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<String> for Changeset {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Changeset::from_paths(None, iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let cs = Changeset::from_paths(
            Some(Path::new("/ws")),
            ["src/a.cpp", "./src/a.cpp", "/ws/src/a.cpp", "  ", "include/b.h"],
        );
        assert_eq!(cs.len(), 2);
        assert_eq!(cs.iter().collect::<Vec<_>>(), vec!["include/b.h", "src/a.cpp"]);
    }

    #[test]
    fn test_empty() {
        let cs: Changeset = Vec::<String>::new().into_iter().collect();
        assert!(cs.is_empty());
    }
}
