//! Implementation of `depmap parse`: build description to dependency index.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::core::index::{DependencyIndex, IndexStatistics};
use crate::core::paths::PathNormalizer;
use crate::index::{Inverter, ProjectFilter};
use crate::parser::{self, ParseOutcome, RecordRules};
use crate::resolver::{
    default_jobs, DependencyOracle, NinjaDepsOracle, Resolution, ResolutionCache, Resolver,
};
use crate::util::config::{load_workspace_config, Config};
use crate::util::fs::absolute;

/// Options for the parse command. Unset fields fall back to the configuration.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Path to `build.ninja`
    pub build_file: PathBuf,

    /// Project root (default: parent of the build directory)
    pub workspace_root: Option<PathBuf>,

    /// Dependency tool name or path
    pub ninja: Option<String>,

    /// Number of parallel oracle invocations
    pub jobs: Option<usize>,

    /// Per-object timeout in seconds (0 disables)
    pub timeout_secs: Option<u64>,

    /// Keep external files in the index
    pub no_filter: bool,

    /// Reuse cached oracle answers
    pub cache: bool,

    /// Show a progress bar while resolving
    pub progress: bool,

    /// Set to stop resolution early
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Resolution and inversion settings, after options and config are merged.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub jobs: usize,
    pub progress: bool,
    pub filter: Option<ProjectFilter>,
    pub cache_path: Option<PathBuf>,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Everything a parse run produced.
#[derive(Debug, Clone)]
pub struct ParseRun {
    pub build_file: PathBuf,
    pub outcome: ParseOutcome,
    pub resolution: Resolution,
    pub index: DependencyIndex,
    /// Distinct files dropped by the project filter
    pub excluded: usize,
}

impl ParseRun {
    /// Counters stored with the exported index.
    pub fn statistics(&self) -> IndexStatistics {
        IndexStatistics {
            total_files: self.index.len(),
            total_executables: self.outcome.graph.target_count(),
            total_object_files: self.outcome.graph.linked_objects().len(),
            files_with_multiple_executables: self.index.shared_files().len(),
            failed_objects: self.resolution.failures.len(),
            skipped_records: self.outcome.skipped(),
        }
    }
}

/// Absolute `(build file, build dir, workspace root)`.
fn locate(
    build_file: &Path,
    workspace_root: Option<&Path>,
) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let build_file = absolute(build_file)?;
    let build_dir = build_file.parent().map(Path::to_path_buf).ok_or_else(|| {
        anyhow!(
            "build description has no parent directory: {}",
            build_file.display()
        )
    })?;
    let workspace_root = match workspace_root {
        Some(root) => absolute(root)?,
        None => build_dir.parent().unwrap_or(&build_dir).to_path_buf(),
    };
    Ok((build_file, build_dir, workspace_root))
}

/// Run the parse pipeline with the configuration found for the workspace.
pub fn depmap_parse(options: &ParseOptions) -> Result<ParseRun> {
    let (_, _, workspace_root) = locate(&options.build_file, options.workspace_root.as_deref())?;
    let config = load_workspace_config(&workspace_root);
    depmap_parse_with_config(options, &config)
}

/// Run the parse pipeline with an explicit configuration.
pub fn depmap_parse_with_config(options: &ParseOptions, config: &Config) -> Result<ParseRun> {
    let (build_file, build_dir, workspace_root) =
        locate(&options.build_file, options.workspace_root.as_deref())?;
    tracing::debug!(
        "Build directory {}, workspace root {}",
        build_dir.display(),
        workspace_root.display()
    );

    let outcome = parser::parse_file(&build_file, &RecordRules::from_config(&config.parse))?;

    let tool = options.ninja.as_deref().unwrap_or(config.ninja());
    let timeout_secs = options
        .timeout_secs
        .unwrap_or_else(|| config.timeout_secs().unwrap_or(0));
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    let oracle = NinjaDepsOracle::new(tool, &build_dir)?.with_timeout(timeout);

    let filter_enabled = config.filter.enabled && !options.no_filter;
    let settings = IndexSettings {
        jobs: options
            .jobs
            .or(config.resolve.jobs)
            .unwrap_or_else(|| default_jobs(config.max_jobs())),
        progress: options.progress,
        filter: filter_enabled
            .then(|| ProjectFilter::from_config(Some(&workspace_root), &config.filter)),
        cache_path: (options.cache || config.resolve.cache)
            .then(|| ResolutionCache::default_path(&build_dir)),
        cancel: options.cancel.clone(),
    };

    let normalizer = PathNormalizer::new(build_dir, workspace_root);
    let (resolution, index, excluded) = build_index(&outcome, &oracle, &normalizer, &settings)?;

    Ok(ParseRun {
        build_file,
        outcome,
        resolution,
        index,
        excluded,
    })
}

/// Resolve every linked object of a parsed graph and invert the result.
///
/// Returns the resolution, the index and the number of files the project
/// filter dropped.
pub fn build_index<O: DependencyOracle + ?Sized>(
    outcome: &ParseOutcome,
    oracle: &O,
    normalizer: &PathNormalizer,
    settings: &IndexSettings,
) -> Result<(Resolution, DependencyIndex, usize)> {
    let graph = &outcome.graph;

    let mut cache = settings
        .cache_path
        .as_ref()
        .map(|path| ResolutionCache::load(path, normalizer.build_dir()));

    let mut resolver = Resolver::new(oracle, normalizer)
        .jobs(settings.jobs)
        .progress(settings.progress);
    if let Some(ref flag) = settings.cancel {
        resolver = resolver.with_cancel_flag(Arc::clone(flag));
    }
    let resolution = resolver.resolve(graph.linked_objects(), cache.as_mut())?;

    if let Some(ref mut cache) = cache {
        cache.save()?;
    }

    if resolution.is_cancelled() {
        bail!(
            "dependency resolution cancelled after {} of {} object files",
            resolution.object_files.len(),
            resolution.object_files.len() + resolution.unresolved.len()
        );
    }

    let inverter = Inverter::new(graph, &resolution, normalizer);
    let inversion = match settings.filter {
        Some(ref filter) => inverter.with_filter(filter).run(),
        None => inverter.run(),
    };

    tracing::info!(
        "Mapped {} files to {} executables",
        inversion.index.len(),
        graph.target_count()
    );

    Ok((resolution, inversion.index, inversion.excluded.len()))
}
