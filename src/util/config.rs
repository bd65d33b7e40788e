//! Configuration file support for depmap.
//!
//! depmap supports two configuration file locations:
//! - Global: `~/.depmap/config.toml` - User-wide defaults
//! - Project: `<workspace>/.depmap/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Hard ceiling on oracle workers unless the config raises it.
pub const DEFAULT_MAX_JOBS: usize = 16;

/// Per-object oracle timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// depmap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dependency resolution settings
    pub resolve: ResolveConfig,

    /// Build description parsing settings
    pub parse: ParseConfig,

    /// Project file classification
    pub filter: FilterConfig,

    /// Changeset selection settings
    pub select: SelectConfig,
}

/// Dependency-oracle settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Oracle tool (ninja) name or path
    pub ninja: Option<String>,

    /// Number of parallel oracle invocations (None = auto-detect)
    pub jobs: Option<usize>,

    /// Upper bound on auto-detected parallelism
    pub max_jobs: Option<usize>,

    /// Per-object timeout in seconds (0 disables the timeout)
    pub timeout_secs: Option<u64>,

    /// Reuse previous oracle results for unchanged object files
    #[serde(default)]
    pub cache: bool,
}

/// Record recognition settings for the build description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Substrings of a rule name that mark a link rule
    pub link_rule_markers: Option<Vec<String>>,

    /// Output prefixes that mark an executable
    pub executable_prefixes: Option<Vec<String>>,

    /// Substrings of a rule name that mark a static or shared library
    pub library_rule_markers: Option<Vec<String>>,

    /// File suffixes that mark an object file
    pub object_extensions: Option<Vec<String>>,
}

/// Project-file classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Drop external files from the index
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Workspace-relative prefixes that are always project files
    pub include_prefixes: Vec<String>,

    /// Absolute prefixes of system include roots
    pub external_prefixes: Option<Vec<String>>,

    /// Path components that mark vendored or staged third-party code
    pub external_markers: Option<Vec<String>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            enabled: true,
            include_prefixes: Vec::new(),
            external_prefixes: None,
            external_markers: None,
        }
    }
}

/// Changeset selection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    /// Target name prefix recognised as a test
    pub test_prefix: Option<String>,

    /// Globs of build-system files whose change forces a full selection
    pub fallback_patterns: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Resolve settings
        if other.resolve.ninja.is_some() {
            self.resolve.ninja = other.resolve.ninja;
        }
        if other.resolve.jobs.is_some() {
            self.resolve.jobs = other.resolve.jobs;
        }
        if other.resolve.max_jobs.is_some() {
            self.resolve.max_jobs = other.resolve.max_jobs;
        }
        if other.resolve.timeout_secs.is_some() {
            self.resolve.timeout_secs = other.resolve.timeout_secs;
        }
        if other.resolve.cache {
            self.resolve.cache = true;
        }

        // Parse settings
        if other.parse.link_rule_markers.is_some() {
            self.parse.link_rule_markers = other.parse.link_rule_markers;
        }
        if other.parse.executable_prefixes.is_some() {
            self.parse.executable_prefixes = other.parse.executable_prefixes;
        }
        if other.parse.library_rule_markers.is_some() {
            self.parse.library_rule_markers = other.parse.library_rule_markers;
        }
        if other.parse.object_extensions.is_some() {
            self.parse.object_extensions = other.parse.object_extensions;
        }

        // Filter settings
        if !other.filter.enabled {
            self.filter.enabled = false;
        }
        if !other.filter.include_prefixes.is_empty() {
            self.filter.include_prefixes = other.filter.include_prefixes;
        }
        if other.filter.external_prefixes.is_some() {
            self.filter.external_prefixes = other.filter.external_prefixes;
        }
        if other.filter.external_markers.is_some() {
            self.filter.external_markers = other.filter.external_markers;
        }

        // Select settings
        if other.select.test_prefix.is_some() {
            self.select.test_prefix = other.select.test_prefix;
        }
        if other.select.fallback_patterns.is_some() {
            self.select.fallback_patterns = other.select.fallback_patterns;
        }
    }

    /// Oracle tool name, defaulting to `ninja`.
    pub fn ninja(&self) -> &str {
        self.resolve.ninja.as_deref().unwrap_or("ninja")
    }

    /// Per-object timeout; `None` when disabled.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self.resolve.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(secs),
        }
    }

    /// Upper bound on oracle workers.
    pub fn max_jobs(&self) -> usize {
        self.resolve.max_jobs.unwrap_or(DEFAULT_MAX_JOBS).max(1)
    }

    /// Test naming prefix, defaulting to `test_`.
    pub fn test_prefix(&self) -> &str {
        self.select.test_prefix.as_deref().unwrap_or("test_")
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.depmap/config.toml)
/// 2. Global config (~/.depmap/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    // Load global config first
    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    // Project config overrides global
    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global depmap config directory (~/.depmap).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".depmap"))
}

/// Get the global config path (~/.depmap/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<workspace>/.depmap/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".depmap").join("config.toml")
}

/// Load the merged configuration for a workspace.
pub fn load_workspace_config(workspace_root: &Path) -> Config {
    let global = global_config_path();
    load_config(global.as_deref(), &project_config_path(workspace_root))
}
