//! High-level operations.
//!
//! This module contains the implementation of depmap commands.

pub mod depmap_parse;
pub mod export;
pub mod query;
pub mod report;
pub mod select;
pub mod vcs;

pub use depmap_parse::{
    build_index, depmap_parse, depmap_parse_with_config, IndexSettings, ParseOptions, ParseRun,
};
pub use export::{export_index, to_csv, to_json, ExportedFiles};
pub use query::{affected_targets, audit, optimize, Affected, Audit};
pub use report::{parse_diagnostics, ParseSummary};
pub use select::{depmap_select, select_from_index, ChangeSource, SelectOptions, TestsToRun};
pub use vcs::changed_files;
