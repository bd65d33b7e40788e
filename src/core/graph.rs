//! The link-target / object-file graph read from the build description.
//!
//! The graph is two adjacency maps keyed by the identifiers the build
//! description uses: target name to ordered object list, and object path to
//! its primary source. It is built once by the parser and never mutated
//! afterwards.

use std::collections::{BTreeMap, BTreeSet};

/// A final linked build product (an executable or test binary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target name as written in the build description (e.g. `bin/test_util`)
    pub name: String,
    /// Object files linked into this target, in link order, without duplicates
    pub objects: Vec<String>,
}

impl Target {
    /// Create a target from its link inputs.
    pub fn new(name: impl Into<String>, objects: Vec<String>) -> Self {
        let mut seen = BTreeSet::new();
        let objects = objects
            .into_iter()
            .filter(|o| seen.insert(o.clone()))
            .collect();
        Target {
            name: name.into(),
            objects,
        }
    }
}

/// An intermediate compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    /// Object path relative to the build directory
    pub id: String,
    /// Primary source, as written in the compile rule
    pub source: String,
}

/// Parsed build graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildGraph {
    targets: BTreeMap<String, Target>,
    objects: BTreeMap<String, ObjectFile>,
}

impl BuildGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target; a later definition of the same name replaces the earlier one.
    pub fn add_target(&mut self, target: Target) -> Option<Target> {
        self.targets.insert(target.name.clone(), target)
    }

    /// Add an object; a later definition of the same id replaces the earlier one.
    pub fn add_object(&mut self, object: ObjectFile) -> Option<ObjectFile> {
        self.objects.insert(object.id.clone(), object)
    }

    /// All targets, ordered by name.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// All compiled objects, ordered by id.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectFile> {
        self.objects.values()
    }

    /// Primary source of an object, if a compile rule for it was seen.
    pub fn source_of(&self, object: &str) -> Option<&str> {
        self.objects.get(object).map(|o| o.source.as_str())
    }

    /// Target name to object list.
    pub fn target_to_objects(&self) -> BTreeMap<&str, &[String]> {
        self.targets
            .values()
            .map(|t| (t.name.as_str(), t.objects.as_slice()))
            .collect()
    }

    /// Object id to primary source.
    pub fn object_to_source(&self) -> BTreeMap<&str, &str> {
        self.objects
            .values()
            .map(|o| (o.id.as_str(), o.source.as_str()))
            .collect()
    }

    /// Distinct objects referenced by at least one target.
    pub fn linked_objects(&self) -> BTreeSet<&str> {
        self.targets
            .values()
            .flat_map(|t| t.objects.iter().map(String::as_str))
            .collect()
    }

    /// Targets that link `object`.
    pub fn owners(&self, object: &str) -> Vec<&str> {
        self.targets
            .values()
            .filter(|t| t.objects.iter().any(|o| o == object))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Number of targets.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of compiled objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
