//! Dependency resolution.
//!
//! Queries the dependency oracle once for every distinct object file, in
//! parallel on a bounded worker pool, and assembles the `object → {file}`
//! map. A failed query never aborts the run: the object is recorded with no
//! dependencies and the failure is reported.

pub mod cache;
pub mod errors;
pub mod oracle;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::core::paths::PathNormalizer;
pub use cache::ResolutionCache;
pub use errors::{OracleError, OracleUnavailable};
pub use oracle::{DependencyOracle, NinjaDepsOracle};

/// Default worker count: available parallelism, capped at `max_jobs`.
pub fn default_jobs(max_jobs: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(max_jobs)
        .max(1)
}

/// Result of resolving a set of object files.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Normalized absolute dependency paths per object. Failed objects map to
    /// an empty set.
    pub object_files: BTreeMap<String, BTreeSet<PathBuf>>,
    /// Objects whose oracle query failed
    pub failures: BTreeMap<String, OracleError>,
    /// Objects never queried because resolution was cancelled
    pub unresolved: Vec<String>,
    /// Objects answered from the cache
    pub cached: usize,
}

impl Resolution {
    /// Whether cancellation cut the run short.
    pub fn is_cancelled(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Number of objects with a successful answer.
    pub fn resolved_count(&self) -> usize {
        self.object_files.len() - self.failures.len()
    }

    /// Dependencies recorded for `object`.
    pub fn files_of(&self, object: &str) -> Option<&BTreeSet<PathBuf>> {
        self.object_files.get(object)
    }
}

/// Parallel driver for the dependency oracle.
pub struct Resolver<'a, O: DependencyOracle + ?Sized> {
    oracle: &'a O,
    normalizer: &'a PathNormalizer,
    jobs: usize,
    progress: bool,
    cancel: Arc<AtomicBool>,
}

impl<'a, O: DependencyOracle + ?Sized> Resolver<'a, O> {
    /// Create a resolver using the default worker count.
    pub fn new(oracle: &'a O, normalizer: &'a PathNormalizer) -> Self {
        Resolver {
            oracle,
            normalizer,
            jobs: default_jobs(crate::util::config::DEFAULT_MAX_JOBS),
            progress: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the number of concurrent oracle calls.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Show a progress bar on stderr.
    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Share a cancellation flag; once set, queued objects are not started.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Resolve every distinct object in `objects`.
    ///
    /// Cached answers are used for unchanged objects when a cache is given,
    /// and fresh successful answers are stored back into it.
    pub fn resolve<'o, I>(
        &self,
        objects: I,
        mut cache: Option<&mut ResolutionCache>,
    ) -> Result<Resolution>
    where
        I: IntoIterator<Item = &'o str>,
    {
        let distinct: BTreeSet<&str> = objects.into_iter().collect();
        let mut resolution = Resolution::default();

        let mut pending = Vec::with_capacity(distinct.len());
        for object in distinct {
            match cache.as_deref().and_then(|c| c.get(object)) {
                Some(files) => {
                    resolution
                        .object_files
                        .insert(object.to_string(), files.clone());
                    resolution.cached += 1;
                }
                None => pending.push(object),
            }
        }

        tracing::info!(
            "Resolving dependencies for {} object files ({} cached, {} jobs)",
            pending.len() + resolution.cached,
            resolution.cached,
            self.jobs
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("depmap-oracle-{}", i))
            .build()
            .context("failed to start dependency worker pool")?;

        let pb = self.progress_bar(pending.len());

        // Each worker owns exactly one object's result; the results are
        // merged into the map after the pool joins.
        let results: Vec<(&str, Result<BTreeSet<PathBuf>, OracleError>)> = pool.install(|| {
            pending
                .par_iter()
                .map(|&object| {
                    if self.cancel.load(Ordering::Relaxed) {
                        return (object, Err(OracleError::Cancelled));
                    }
                    let result = self.query_one(object);
                    if let Some(ref pb) = pb {
                        pb.inc(1);
                    }
                    (object, result)
                })
                .collect()
        });

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        for (object, result) in results {
            match result {
                Ok(files) => {
                    if let Some(cache) = cache.as_deref_mut() {
                        cache.insert(object, &files);
                    }
                    resolution.object_files.insert(object.to_string(), files);
                }
                Err(OracleError::Cancelled) => resolution.unresolved.push(object.to_string()),
                Err(e) => {
                    tracing::debug!("dependency query failed for {}: {}", object, e);
                    resolution
                        .object_files
                        .insert(object.to_string(), BTreeSet::new());
                    resolution.failures.insert(object.to_string(), e);
                }
            }
        }

        if !resolution.failures.is_empty() {
            tracing::warn!(
                "Dependency query failed for {} of {} object files",
                resolution.failures.len(),
                resolution.object_files.len()
            );
        }
        if resolution.is_cancelled() {
            tracing::warn!(
                "Resolution cancelled with {} object files still queued",
                resolution.unresolved.len()
            );
        }

        Ok(resolution)
    }

    fn query_one(&self, object: &str) -> Result<BTreeSet<PathBuf>, OracleError> {
        tracing::trace!("querying dependencies of {}", object);
        let raw = self.oracle.query(object)?;
        Ok(raw.iter().map(|p| self.normalizer.absolute(p)).collect())
    }

    fn progress_bar(&self, total: usize) -> Option<ProgressBar> {
        if !self.progress || total <= 1 {
            return None;
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} Resolving [{bar:40.cyan/blue}] {pos}/{len} objects")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}
