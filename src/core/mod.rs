//! Core data model for depmap.

pub mod changeset;
pub mod graph;
pub mod index;
pub mod paths;

pub use changeset::Changeset;
pub use graph::{BuildGraph, ObjectFile, Target};
pub use index::{DependencyIndex, IndexDocument, IndexStatistics};
pub use paths::PathNormalizer;
