//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// depmap - map C/C++ files to the executables that depend on them
#[derive(Parser)]
#[command(name = "depmap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse build.ninja and generate the dependency mapping
    Parse(ParseArgs),

    /// Select the tests affected by changes between two git refs
    Select(SelectArgs),

    /// List all files and their dependent executables
    Audit(AuditArgs),

    /// List the executables affected by changed files
    Optimize(OptimizeArgs),
}

#[derive(Args)]
pub struct ParseArgs {
    /// Path to build.ninja
    pub build_ninja: PathBuf,

    /// Path to the ninja executable
    #[arg(long, env = "DEPMAP_NINJA")]
    pub ninja: Option<String>,

    /// Project root (defaults to the parent of the build directory)
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Number of parallel dependency queries
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Per-object query timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep system and third-party files in the mapping
    #[arg(long)]
    pub no_filter: bool,

    /// Reuse dependency answers for unchanged object files
    #[arg(long)]
    pub cache: bool,

    /// Directory for the CSV and JSON exports
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Args)]
pub struct SelectArgs {
    /// Path to the dependency mapping JSON
    pub depmap_json: PathBuf,

    /// Source git ref
    #[arg(required_unless_present = "files")]
    pub ref1: Option<String>,

    /// Target git ref
    #[arg(required_unless_present = "files")]
    pub ref2: Option<String>,

    /// Select every executable in the mapping
    #[arg(long, conflicts_with = "test_prefix")]
    pub all: bool,

    /// Only select executables whose name starts with PREFIX (default: test_)
    #[arg(long, value_name = "PREFIX", num_args = 0..=1, require_equals = true)]
    pub test_prefix: Option<Option<String>>,

    /// Don't escalate when build-system files changed
    #[arg(long)]
    pub no_fallback: bool,

    /// Output JSON file
    #[arg(short, long, default_value = "tests-to-run.json")]
    pub output: PathBuf,

    /// Use these changed files instead of a git diff
    #[arg(long, num_args = 1.., conflicts_with_all = ["ref1", "ref2"])]
    pub files: Vec<String>,

    /// Git repository to diff (defaults to the current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,
}

#[derive(Args)]
pub struct AuditArgs {
    /// Path to the dependency mapping JSON
    pub depmap_json: PathBuf,
}

#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to the dependency mapping JSON
    pub depmap_json: PathBuf,

    /// Changed files
    #[arg(required = true)]
    pub changed_files: Vec<String>,
}
