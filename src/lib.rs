//! depmap - file to target dependency mapping for ninja builds
//!
//! This crate provides the core library functionality for depmap: parsing
//! the build description, querying per-object dependencies, inverting them
//! into a file-to-target index and selecting the targets a change affects.

pub mod core;
pub mod index;
pub mod ops;
pub mod parser;
pub mod resolver;
pub mod select;
pub mod util;

pub use core::{BuildGraph, Changeset, DependencyIndex, ObjectFile, PathNormalizer, Target};
pub use index::{invert, is_project_file, FileClassifier, ProjectFilter};
pub use parser::{parse, parse_file, GraphError, ParseOutcome, RecordRules};
pub use resolver::{DependencyOracle, NinjaDepsOracle, OracleError, Resolution, Resolver};
pub use select::{select, SelectMode};
pub use util::config::Config;
