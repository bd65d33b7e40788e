//! The dependency oracle: given one object file, list every file it was
//! compiled from (primary source plus all transitively included headers).
//!
//! The production oracle is `ninja -t deps <object>`, which answers from the
//! `.ninja_deps` log written during the last build.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::resolver::errors::{OracleError, OracleUnavailable};
use crate::util::process::{find_executable, ProcessBuilder, ProcessError};

/// Header line of one `ninja -t deps` record.
static DEPS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<target>.+): #deps (?P<count>\d+), deps mtime (?P<mtime>\d+) \((?P<state>VALID|STALE)\)$")
        .expect("deps header regex is valid")
});

/// Answers "which files does this object depend on?".
///
/// Implementations must be callable from several worker threads at once.
pub trait DependencyOracle: Sync {
    /// List the raw dependency paths of `object` (absolute or relative to the
    /// build directory).
    fn query(&self, object: &str) -> Result<Vec<String>, OracleError>;
}

impl<F> DependencyOracle for F
where
    F: Fn(&str) -> Result<Vec<String>, OracleError> + Sync,
{
    fn query(&self, object: &str) -> Result<Vec<String>, OracleError> {
        self(object)
    }
}

/// Oracle backed by `ninja -t deps`.
#[derive(Debug, Clone)]
pub struct NinjaDepsOracle {
    program: PathBuf,
    build_dir: PathBuf,
    timeout: Option<Duration>,
}

impl NinjaDepsOracle {
    /// Locate the ninja executable and bind it to a build directory.
    pub fn new(tool: &str, build_dir: impl Into<PathBuf>) -> Result<Self, OracleUnavailable> {
        let program = find_executable(tool).ok_or_else(|| OracleUnavailable {
            tool: tool.to_string(),
        })?;
        tracing::debug!("Using dependency tool {}", program.display());
        Ok(NinjaDepsOracle {
            program,
            build_dir: build_dir.into(),
            timeout: None,
        })
    }

    /// Bound each query; a query running longer is killed and reported as failed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl DependencyOracle for NinjaDepsOracle {
    fn query(&self, object: &str) -> Result<Vec<String>, OracleError> {
        let output = ProcessBuilder::new(&self.program)
            .args(["-t", "deps", object])
            .cwd(&self.build_dir)
            .timeout(self.timeout)
            .exec()
            .map_err(|e| match e {
                ProcessError::Timeout { timeout, .. } => OracleError::Timeout {
                    secs: timeout.as_secs(),
                },
                other => OracleError::Spawn {
                    message: other.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(OracleError::ExitStatus {
                code: output.status.code(),
                stderr: output.stderr.lines().next().unwrap_or("").trim().to_string(),
            });
        }

        parse_deps_output(&output.stdout)
    }
}

/// Parse the output of `ninja -t deps <object>`.
///
/// ```text
/// CMakeFiles/app.dir/main.cpp.o: #deps 2, deps mtime 1712345678 (VALID)
///     ../src/main.cpp
///     ../include/common.h
/// ```
pub fn parse_deps_output(stdout: &str) -> Result<Vec<String>, OracleError> {
    let mut lines = stdout.lines().skip_while(|l| l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Err(OracleError::Empty);
    };
    let header = header.trim_end();
    match DEPS_HEADER.captures(header) {
        Some(caps) if &caps["state"] == "STALE" => {
            tracing::debug!("{}: dependency data is stale", &caps["target"]);
        }
        Some(_) => {}
        None if header.ends_with("deps not found") => return Err(OracleError::Empty),
        None => tracing::trace!("unexpected deps header: {}", header),
    }

    let deps: Vec<String> = lines
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    if deps.is_empty() {
        return Err(OracleError::Empty);
    }
    Ok(deps)
}
