//! Graph inversion: turn `target → objects → files` into `file → targets`.

pub mod filter;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::core::graph::BuildGraph;
use crate::core::index::DependencyIndex;
use crate::core::paths::PathNormalizer;
use crate::resolver::Resolution;
pub use filter::{is_project_file, FileClassifier, ProjectFilter};

/// Outcome of an inversion.
#[derive(Debug, Clone, Default)]
pub struct Inversion {
    pub index: DependencyIndex,
    /// Distinct files dropped by the project filter, as index keys
    pub excluded: BTreeSet<String>,
}

/// Inverts a resolved build graph into a [`DependencyIndex`].
pub struct Inverter<'a> {
    graph: &'a BuildGraph,
    resolution: &'a Resolution,
    normalizer: &'a PathNormalizer,
    filter: Option<&'a dyn FileClassifier>,
}

impl<'a> Inverter<'a> {
    pub fn new(
        graph: &'a BuildGraph,
        resolution: &'a Resolution,
        normalizer: &'a PathNormalizer,
    ) -> Self {
        Inverter {
            graph,
            resolution,
            normalizer,
            filter: None,
        }
    }

    /// Drop files the classifier rejects.
    pub fn with_filter(mut self, filter: &'a dyn FileClassifier) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Files an object contributes: the oracle's answer plus its primary source.
    fn files_of(&self, object: &str) -> BTreeSet<PathBuf> {
        let mut files = self
            .resolution
            .files_of(object)
            .cloned()
            .unwrap_or_default();
        if let Some(source) = self.graph.source_of(object) {
            files.insert(self.normalizer.absolute(source));
        }
        files
    }

    pub fn run(&self) -> Inversion {
        let mut index = DependencyIndex::new(Some(self.normalizer.workspace_root().to_path_buf()));
        let mut excluded = BTreeSet::new();

        // Classification happens once per distinct file; `None` marks an
        // excluded file.
        let mut keys: HashMap<PathBuf, Option<String>> = HashMap::new();
        let mut object_keys: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for object in self.graph.linked_objects() {
            let mut kept = Vec::new();
            for file in self.files_of(object) {
                let key = keys
                    .entry(file)
                    .or_insert_with_key(|file| self.classify(file, &mut excluded))
                    .clone();
                kept.extend(key);
            }
            object_keys.insert(object, kept);
        }

        for target in self.graph.targets() {
            for object in &target.objects {
                let Some(files) = object_keys.get(object.as_str()) else {
                    continue;
                };
                for key in files {
                    index.insert(key.as_str(), target.name.as_str());
                }
            }
        }

        tracing::debug!(
            "Inverted {} targets into {} files ({} excluded)",
            self.graph.target_count(),
            index.len(),
            excluded.len()
        );

        Inversion { index, excluded }
    }

    fn classify(&self, file: &Path, excluded: &mut BTreeSet<String>) -> Option<String> {
        let key = self.normalizer.key(file);
        match self.filter {
            Some(filter) if !filter.is_project_file(file) => {
                tracing::trace!("excluding external file {}", key);
                excluded.insert(key);
                None
            }
            _ => Some(key),
        }
    }
}

/// Invert a resolved graph, optionally dropping files `filter` rejects.
pub fn invert(
    graph: &BuildGraph,
    resolution: &Resolution,
    normalizer: &PathNormalizer,
    filter: Option<&dyn FileClassifier>,
) -> DependencyIndex {
    let inverter = Inverter::new(graph, resolution, normalizer);
    match filter {
        Some(filter) => inverter.with_filter(filter).run().index,
        None => inverter.run().index,
    }
}
