//! Build description parser.
//!
//! Reads a ninja build file and produces the [`BuildGraph`]: which object
//! files each executable links, and which source each object is compiled
//! from. Records that can't be understood are counted and skipped; only an
//! unreadable build file is fatal.

pub mod ninja;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::graph::{BuildGraph, ObjectFile, Target};
use crate::util::config::ParseConfig;
use ninja::{logical_lines, parse_build_statement, BuildStatement};

/// How many malformed records are kept verbatim for the report.
const MAX_KEPT_MALFORMED: usize = 20;

/// Fatal failure to obtain the build description.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("build description unavailable: {}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A `build` record that was skipped because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub line: usize,
    pub reason: String,
}

/// Rules for recognising link and compile records.
#[derive(Debug, Clone)]
pub struct RecordRules {
    /// Substrings of a rule name marking an executable link
    pub link_rule_markers: Vec<String>,
    /// Output prefixes marking an executable
    pub executable_prefixes: Vec<String>,
    /// Substrings of a rule name marking a static or shared library
    pub library_rule_markers: Vec<String>,
    /// Suffixes of object files
    pub object_extensions: Vec<String>,
}

impl Default for RecordRules {
    fn default() -> Self {
        RecordRules {
            link_rule_markers: vec!["EXECUTABLE".to_string()],
            executable_prefixes: vec!["bin/".to_string()],
            library_rule_markers: vec!["LIBRARY".to_string()],
            object_extensions: vec![".o".to_string(), ".obj".to_string()],
        }
    }
}

impl RecordRules {
    /// Apply the `[parse]` section of the configuration over the defaults.
    pub fn from_config(config: &ParseConfig) -> Self {
        let mut rules = RecordRules::default();
        if let Some(ref markers) = config.link_rule_markers {
            rules.link_rule_markers = markers.clone();
        }
        if let Some(ref prefixes) = config.executable_prefixes {
            rules.executable_prefixes = prefixes.clone();
        }
        if let Some(ref markers) = config.library_rule_markers {
            rules.library_rule_markers = markers.clone();
        }
        if let Some(ref exts) = config.object_extensions {
            rules.object_extensions = exts.clone();
        }
        rules
    }

    fn is_object(&self, path: &str) -> bool {
        self.object_extensions.iter().any(|ext| path.ends_with(ext))
    }

    fn is_executable(&self, stmt: &BuildStatement) -> bool {
        let by_rule = self
            .link_rule_markers
            .iter()
            .any(|m| stmt.rule.contains(m.as_str()));
        let by_output = self
            .executable_prefixes
            .iter()
            .any(|p| stmt.outputs[0].starts_with(p.as_str()));
        by_rule || by_output
    }

    fn is_library(&self, stmt: &BuildStatement) -> bool {
        self.library_rule_markers
            .iter()
            .any(|m| stmt.rule.contains(m.as_str()))
    }
}

/// Result of parsing a build description.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub graph: BuildGraph,
    /// `build` records that could not be tokenized
    pub malformed_count: usize,
    /// Well-formed `build` records that are neither link nor compile rules
    pub unrecognized_count: usize,
    /// The first few malformed records, for diagnostics
    pub malformed: Vec<MalformedRecord>,
}

impl ParseOutcome {
    /// Total number of skipped `build` records.
    pub fn skipped(&self) -> usize {
        self.malformed_count + self.unrecognized_count
    }
}

/// Read and parse a build description from disk.
pub fn parse_file(path: &Path, rules: &RecordRules) -> Result<ParseOutcome, GraphError> {
    let text = std::fs::read_to_string(path).map_err(|source| GraphError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Parsing build description {}", path.display());
    Ok(parse(&text, rules))
}

/// Parse build description text.
pub fn parse(text: &str, rules: &RecordRules) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    // Library output -> (objects, library inputs)
    let mut libraries: BTreeMap<String, (Vec<String>, Vec<String>)> = BTreeMap::new();
    // Any output of a library record (import library, soname) -> first output
    let mut library_names: BTreeMap<String, String> = BTreeMap::new();
    // Executable -> (own objects, library inputs)
    let mut executables: Vec<(String, Vec<String>, Vec<String>)> = Vec::new();

    for line in logical_lines(text) {
        let Some(rest) = line.text.strip_prefix("build ") else {
            continue;
        };

        let stmt = match parse_build_statement(line.line, rest) {
            Ok(stmt) => stmt,
            Err(e) => {
                tracing::debug!("line {}: skipping malformed build record: {}", line.line, e);
                outcome.malformed_count += 1;
                if outcome.malformed.len() < MAX_KEPT_MALFORMED {
                    outcome.malformed.push(MalformedRecord {
                        line: line.line,
                        reason: e.to_string(),
                    });
                }
                continue;
            }
        };

        if stmt.rule == "phony" {
            outcome.unrecognized_count += 1;
            continue;
        }

        let objects: Vec<String> = stmt
            .inputs
            .iter()
            .filter(|i| rules.is_object(i))
            .cloned()
            .collect();
        let linked_libs: Vec<String> = stmt
            .inputs
            .iter()
            .chain(&stmt.implicit_inputs)
            .filter(|i| !rules.is_object(i))
            .cloned()
            .collect();

        if rules.is_library(&stmt) {
            let name = &stmt.outputs[0];
            for output in stmt.outputs.iter().chain(&stmt.implicit_outputs) {
                library_names.insert(output.clone(), name.clone());
            }
            libraries.insert(name.clone(), (objects, linked_libs));
        } else if rules.is_executable(&stmt) && !(objects.is_empty() && linked_libs.is_empty()) {
            executables.push((stmt.outputs[0].clone(), objects, linked_libs));
        } else if rules.is_object(&stmt.outputs[0]) && !stmt.inputs.is_empty() {
            let object = ObjectFile {
                id: stmt.outputs[0].clone(),
                source: stmt.inputs[0].clone(),
            };
            if let Some(prev) = outcome.graph.add_object(object) {
                tracing::debug!("line {}: object `{}` redefined", stmt.line, prev.id);
            }
        } else {
            tracing::trace!("line {}: skipping `{}` record", stmt.line, stmt.rule);
            outcome.unrecognized_count += 1;
        }
    }

    for (name, mut objects, libs) in executables {
        let mut visited = BTreeSet::new();
        for lib in &libs {
            collect_library_objects(lib, &libraries, &library_names, &mut visited, &mut objects);
        }
        if let Some(prev) = outcome.graph.add_target(Target::new(name, objects)) {
            tracing::debug!("target `{}` redefined", prev.name);
        }
    }

    tracing::info!(
        "Found {} executables and {} object-to-source mappings",
        outcome.graph.target_count(),
        outcome.graph.object_count()
    );
    if outcome.skipped() > 0 {
        tracing::debug!(
            "Skipped {} build records ({} malformed, {} unrecognized)",
            outcome.skipped(),
            outcome.malformed_count,
            outcome.unrecognized_count
        );
    }

    outcome
}

/// Append the objects of `lib` and of every library it links, depth first.
///
/// `lib` may name any output of a library record.
fn collect_library_objects(
    lib: &str,
    libraries: &BTreeMap<String, (Vec<String>, Vec<String>)>,
    library_names: &BTreeMap<String, String>,
    visited: &mut BTreeSet<String>,
    objects: &mut Vec<String>,
) {
    let Some(name) = library_names.get(lib) else {
        return;
    };
    if !visited.insert(name.clone()) {
        return;
    }
    let Some((lib_objects, lib_deps)) = libraries.get(name) else {
        return;
    };
    objects.extend(lib_objects.iter().cloned());
    for dep in lib_deps {
        collect_library_objects(dep, libraries, library_names, visited, objects);
    }
}
