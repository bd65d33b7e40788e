//! Path normalization shared by the resolver, inverter and selector.
//!
//! Every file path that enters the index passes through [`PathNormalizer`],
//! so one logical file is never represented by two distinct strings.

use std::path::{Path, PathBuf};

use crate::util::fs::{is_inside, normalize_lexically, relative_path};

/// Converts build-relative and absolute paths into canonical index keys.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    /// Absolute directory containing the build description
    build_dir: PathBuf,
    /// Absolute project root
    workspace_root: PathBuf,
}

impl PathNormalizer {
    /// Create a normalizer. Both directories must already be absolute.
    pub fn new(build_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        PathNormalizer {
            build_dir: normalize_lexically(&build_dir.into()),
            workspace_root: normalize_lexically(&workspace_root.into()),
        }
    }

    /// The absolute build directory.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// The absolute workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Resolve a path as the build tool reports it (absolute or relative to
    /// the build directory) to a normalized absolute path.
    pub fn absolute(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            normalize_lexically(path)
        } else {
            normalize_lexically(&self.build_dir.join(path))
        }
    }

    /// The index key for a normalized absolute path: workspace-relative when
    /// inside the workspace, absolute otherwise. Separators are always `/`.
    pub fn key(&self, absolute: &Path) -> String {
        key_for(&self.workspace_root, absolute)
    }
}

/// Index key for `absolute` relative to `workspace_root`.
pub fn key_for(workspace_root: &Path, absolute: &Path) -> String {
    let shown = if is_inside(absolute, workspace_root) {
        relative_path(workspace_root, absolute)
    } else {
        absolute.to_path_buf()
    };
    shown.to_string_lossy().replace('\\', "/")
}

/// Normalize a user-supplied changed-file path into an index key.
///
/// Relative paths are taken as workspace-relative (that is what VCS diffs
/// report); absolute paths under `workspace_root` are made relative.
pub fn changed_file_key(workspace_root: Option<&Path>, raw: &str) -> String {
    let path = Path::new(raw);
    match workspace_root {
        Some(root) if path.is_absolute() => key_for(root, &normalize_lexically(path)),
        _ => normalize_lexically(path)
            .to_string_lossy()
            .replace('\\', "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> PathNormalizer {
        PathNormalizer::new("/ws/build", "/ws")
    }

    #[test]
    fn test_absolute_from_build_relative() {
        let n = normalizer();
        assert_eq!(
            n.absolute("../src/main.cpp"),
            PathBuf::from("/ws/src/main.cpp")
        );
        assert_eq!(
            n.absolute("include/config.h"),
            PathBuf::from("/ws/build/include/config.h")
        );
        assert_eq!(
            n.absolute("/usr/include/stdio.h"),
            PathBuf::from("/usr/include/stdio.h")
        );
    }

    #[test]
    fn test_same_file_two_spellings() {
        let n = normalizer();
        let a = n.absolute("../include/common.h");
        let b = n.absolute("/ws/include/./common.h");
        assert_eq!(n.key(&a), n.key(&b));
        assert_eq!(n.key(&a), "include/common.h");
    }

    #[test]
    fn test_key_outside_workspace() {
        let n = normalizer();
        let abs = n.absolute("/usr/include/vector");
        assert_eq!(n.key(&abs), "/usr/include/vector");
    }

    #[test]
    fn test_changed_file_key() {
        let root = Path::new("/ws");
        assert_eq!(changed_file_key(Some(root), "./src/a.cpp"), "src/a.cpp");
        assert_eq!(changed_file_key(Some(root), "/ws/src/a.cpp"), "src/a.cpp");
        assert_eq!(changed_file_key(None, "src/a.cpp"), "src/a.cpp");
        assert_eq!(
            changed_file_key(Some(root), "/elsewhere/a.cpp"),
            "/elsewhere/a.cpp"
        );
    }
}
