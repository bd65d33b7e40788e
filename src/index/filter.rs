//! Project vs. external file classification.
//!
//! The classification is a heuristic over path prefixes: system include
//! roots, vendored or staged third-party directories and anything outside the
//! workspace are external. It is a tunable policy, not a correctness
//! guarantee; vendored first-party code may need an `include_prefixes` entry.
//!
//! Classifiers are pure functions of the path, so they do no I/O.

use std::path::{Path, PathBuf};

use crate::util::config::FilterConfig;

/// System include roots treated as external by default.
pub const DEFAULT_EXTERNAL_PREFIXES: &[&str] = &[
    "/usr/",
    "/opt/",
    "/lib/",
    "/lib64/",
    "/System/",
    "/Library/",
];

/// Directory names marking vendored or staged dependencies by default.
pub const DEFAULT_EXTERNAL_MARKERS: &[&str] = &["_deps", "third_party", "external"];

/// Decides whether a normalized absolute path belongs to the project.
pub trait FileClassifier: Sync {
    fn is_project_file(&self, path: &Path) -> bool;
}

impl<F> FileClassifier for F
where
    F: Fn(&Path) -> bool + Sync,
{
    fn is_project_file(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Prefix-based classifier.
#[derive(Debug, Clone)]
pub struct ProjectFilter {
    workspace_root: Option<PathBuf>,
    include_prefixes: Vec<PathBuf>,
    external_prefixes: Vec<PathBuf>,
    external_markers: Vec<String>,
}

impl ProjectFilter {
    /// Classifier with the default system prefixes and vendor markers.
    pub fn new(workspace_root: Option<&Path>) -> Self {
        ProjectFilter {
            workspace_root: workspace_root.map(Path::to_path_buf),
            include_prefixes: Vec::new(),
            external_prefixes: DEFAULT_EXTERNAL_PREFIXES.iter().map(PathBuf::from).collect(),
            external_markers: DEFAULT_EXTERNAL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Classifier configured by the `[filter]` section.
    pub fn from_config(workspace_root: Option<&Path>, config: &FilterConfig) -> Self {
        let mut filter = ProjectFilter::new(workspace_root);
        filter.include_prefixes = config
            .include_prefixes
            .iter()
            .map(|p| match workspace_root {
                Some(root) if Path::new(p).is_relative() => root.join(p),
                _ => PathBuf::from(p),
            })
            .collect();
        if let Some(ref prefixes) = config.external_prefixes {
            filter.external_prefixes = prefixes.iter().map(PathBuf::from).collect();
        }
        if let Some(ref markers) = config.external_markers {
            filter.external_markers = markers.clone();
        }
        filter
    }

    /// A prefix enclosing the workspace root (a checkout in `/opt/proj`)
    /// never excludes the workspace itself.
    fn contains_workspace(&self, prefix: &Path) -> bool {
        self.workspace_root
            .as_deref()
            .is_some_and(|root| root.starts_with(prefix))
    }

    fn under_workspace<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        match self.workspace_root {
            Some(ref root) => path.strip_prefix(root).ok(),
            None if path.is_relative() => Some(path),
            None => None,
        }
    }
}

impl FileClassifier for ProjectFilter {
    fn is_project_file(&self, path: &Path) -> bool {
        if self.include_prefixes.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        if self
            .external_prefixes
            .iter()
            .any(|p| path.starts_with(p) && !self.contains_workspace(p))
        {
            return false;
        }

        // Markers are matched below the workspace root only, so a checkout
        // living in e.g. `/home/me/external/proj` is not itself external.
        let local = match (&self.workspace_root, path.is_absolute()) {
            (Some(_), true) => match self.under_workspace(path) {
                Some(rel) => rel,
                None => return false,
            },
            _ => path,
        };

        !local.components().any(|c| {
            let c = c.as_os_str().to_string_lossy();
            self.external_markers.iter().any(|m| *m == c)
        })
    }
}

/// Classify `path` with the default policy.
pub fn is_project_file(path: &Path, workspace_root: Option<&Path>) -> bool {
    ProjectFilter::new(workspace_root).is_project_file(path)
}
