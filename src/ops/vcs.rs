//! Changed files between two revisions of a git repository.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{DiffOptions, Repository};

/// Files that differ between `from` and `to`, relative to the repository root.
///
/// Both sides of a rename are reported, since either path may be a key in
/// the index.
pub fn changed_files(repo_path: &Path, from: &str, to: &str) -> Result<BTreeSet<String>> {
    let repo = Repository::discover(repo_path)
        .with_context(|| format!("failed to open git repository at {}", repo_path.display()))?;

    let tree = |rev: &str| {
        repo.revparse_single(rev)
            .and_then(|obj| obj.peel_to_tree())
            .with_context(|| format!("unknown revision `{}`", rev))
    };
    let old_tree = tree(from)?;
    let new_tree = tree(to)?;

    let mut opts = DiffOptions::new();
    opts.include_typechange(true);
    let diff = repo
        .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))
        .with_context(|| format!("failed to diff {}..{}", from, to))?;

    let mut files = BTreeSet::new();
    for delta in diff.deltas() {
        for file in [delta.old_file(), delta.new_file()] {
            if let Some(path) = file.path() {
                files.insert(path.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    tracing::info!("{} files changed between {} and {}", files.len(), from, to);
    Ok(files)
}

/// Root of the working tree containing `path`, if any.
pub fn workdir(path: &Path) -> Option<PathBuf> {
    Repository::discover(path)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Oid, Signature};
    use tempfile::TempDir;

    fn commit(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
        let root = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (path, contents) in files {
            let full = root.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, contents).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<_> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parents: Vec<_> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_changed_files_between_commits() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let first = commit(
            &repo,
            &[("src/main.cpp", "int main() {}"), ("include/util.h", "#pragma once")],
            "initial",
        );
        let second = commit(
            &repo,
            &[("include/util.h", "#pragma once\nint f();"), ("src/new.cpp", "")],
            "change",
        );

        let files = changed_files(tmp.path(), &first.to_string(), &second.to_string()).unwrap();
        let files: Vec<_> = files.into_iter().collect();
        assert_eq!(files, vec!["include/util.h", "src/new.cpp"]);

        let none = changed_files(tmp.path(), "HEAD", "HEAD").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unknown_revision() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        commit(&repo, &[("a.cpp", "")], "initial");

        let err = changed_files(tmp.path(), "HEAD", "no-such-branch").unwrap_err();
        assert!(err.to_string().contains("unknown revision `no-such-branch`"));
    }

    #[test]
    fn test_workdir() {
        let tmp = TempDir::new().unwrap();
        Repository::init(tmp.path()).unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let root = workdir(&tmp.path().join("sub")).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }
}
