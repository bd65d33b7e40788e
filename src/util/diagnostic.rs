//! User-facing warnings for the summary report.
//!
//! Recoverable problems (failed oracle calls, skipped build records) are
//! collected as diagnostics and printed after a run, each with enough context
//! to act on.

use std::fmt;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Common suggestion messages for consistent reporting.
pub mod suggestions {
    /// Suggestion when the oracle has no dependency data for some objects.
    pub const STALE_DEPS: &str =
        "Build the project once with ninja so that `.ninja_deps` is populated";

    /// Suggestion when oracle calls time out.
    pub const SLOW_ORACLE: &str = "Raise `resolve.timeout_secs` or lower `resolve.jobs`";

    /// Suggestion when build records are skipped.
    pub const SKIPPED_RECORDS: &str =
        "Run with --verbose to list skipped records, or adjust `[parse]` in .depmap/config.toml";
}

/// A warning with optional context and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color {
            "\x1b[1;33mwarning\x1b[0m"
        } else {
            "warning"
        };

        output.push_str(&format!("{}: {}\n", label, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            for suggestion in &self.suggestions {
                output.push_str(&format!("{}: {}\n", help_prefix, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr, colored when stderr is a terminal.
pub fn emit(diagnostic: &Diagnostic) {
    eprint!("{}", diagnostic.format(std::io::stderr().is_terminal()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::warning("dependency query failed for 2 object(s)")
            .with_location("build/build.ninja")
            .with_context("CMakeFiles/app.dir/main.cpp.o: no dependency data")
            .with_suggestion(suggestions::STALE_DEPS);

        let output = diag.format(false);
        assert!(output.starts_with("warning: dependency query failed"));
        assert!(output.contains("--> build/build.ninja"));
        assert!(output.contains("= CMakeFiles/app.dir/main.cpp.o"));
        assert!(output.contains("help: Build the project once"));
    }

    #[test]
    fn test_diagnostic_colored() {
        let diag = Diagnostic::warning("3 build records skipped");
        assert!(diag.format(true).contains("\x1b[1;33mwarning"));
        assert_eq!(diag.to_string(), "warning: 3 build records skipped\n");
    }
}
