//! Summary report printed after `depmap parse`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::ops::depmap_parse::ParseRun;
use crate::resolver::OracleError;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// How many shared files the summary lists.
const TOP_SHARED: usize = 10;

/// How many failed objects a diagnostic names before summarizing the rest.
const MAX_LISTED_FAILURES: usize = 5;

/// Counts the index keys by file kind.
fn file_types<'a>(files: impl Iterator<Item = &'a String>) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for file in files {
        let kind = match Path::new(file).extension().and_then(|e| e.to_str()) {
            Some("cpp") => ".cpp",
            Some("hpp") => ".hpp",
            Some("h") => ".h",
            _ => "other",
        };
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

/// Human-readable summary of a parse run.
pub struct ParseSummary<'a> {
    run: &'a ParseRun,
}

impl<'a> ParseSummary<'a> {
    pub fn new(run: &'a ParseRun) -> Self {
        ParseSummary { run }
    }
}

impl fmt::Display for ParseSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.run;
        let stats = run.statistics();

        writeln!(f, "Dependency Mapping Summary")?;
        writeln!(f, "==========================")?;
        writeln!(f, "  Executables:        {}", stats.total_executables)?;
        writeln!(f, "  Object files:       {}", stats.total_object_files)?;
        writeln!(f, "  Files mapped:       {}", stats.total_files)?;
        writeln!(f, "  Shared files:       {}", stats.files_with_multiple_executables)?;
        if run.excluded > 0 {
            writeln!(f, "  External (dropped): {}", run.excluded)?;
        }
        if run.resolution.cached > 0 {
            writeln!(f, "  Cached objects:     {}", run.resolution.cached)?;
        }

        let shared = run.index.shared_files();
        if !shared.is_empty() {
            writeln!(f)?;
            writeln!(f, "Most shared files:")?;
            for (file, count) in shared.iter().take(TOP_SHARED) {
                writeln!(f, "  {} ({} executables)", file, count)?;
            }
        }

        let types = file_types(run.index.iter().map(|(file, _)| file));
        if !types.is_empty() {
            writeln!(f)?;
            writeln!(f, "File types:")?;
            for (kind, count) in &types {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        if stats.failed_objects > 0 || stats.skipped_records > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "Warnings: {} failed objects, {} skipped build records",
                stats.failed_objects, stats.skipped_records
            )?;
        }
        Ok(())
    }
}

/// Recoverable problems of a parse run, as diagnostics.
pub fn parse_diagnostics(run: &ParseRun) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let outcome = &run.outcome;
    if outcome.malformed_count > 0 {
        let mut diag = Diagnostic::warning(format!(
            "skipped {} malformed build records",
            outcome.malformed_count
        ))
        .with_location(&run.build_file)
        .with_suggestion(suggestions::SKIPPED_RECORDS);
        for record in outcome.malformed.iter().take(MAX_LISTED_FAILURES) {
            diag = diag.with_context(format!("line {}: {}", record.line, record.reason));
        }
        diagnostics.push(diag);
    }

    let failures = &run.resolution.failures;
    if !failures.is_empty() {
        let mut diag = Diagnostic::warning(format!(
            "dependency query failed for {} object files; they contribute only their primary source",
            failures.len()
        ));
        for (object, error) in failures.iter().take(MAX_LISTED_FAILURES) {
            diag = diag.with_context(format!("{}: {}", object, error));
        }
        if failures.len() > MAX_LISTED_FAILURES {
            diag = diag.with_context(format!(
                "... and {} more",
                failures.len() - MAX_LISTED_FAILURES
            ));
        }
        if failures.values().any(|e| *e == OracleError::Empty) {
            diag = diag.with_suggestion(suggestions::STALE_DEPS);
        }
        if failures
            .values()
            .any(|e| matches!(e, OracleError::Timeout { .. }))
        {
            diag = diag.with_suggestion(suggestions::SLOW_ORACLE);
        }
        diagnostics.push(diag);
    }

    diagnostics
}
