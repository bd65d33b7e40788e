//! `depmap select` command

use anyhow::{Context, Result};

use crate::cli::SelectArgs;
use depmap::ops::{select_from_index, ChangeSource, SelectOptions};
use depmap::select::SelectMode;
use depmap::util::config::load_workspace_config;
use depmap::DependencyIndex;

pub fn execute(args: SelectArgs) -> Result<()> {
    let index = DependencyIndex::load(&args.depmap_json)?;

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = load_workspace_config(index.workspace_root().unwrap_or(cwd.as_path()));

    let mode = if args.all {
        SelectMode::All
    } else if let Some(prefix) = args.test_prefix {
        SelectMode::TestPrefix(prefix.unwrap_or_else(|| config.test_prefix().to_string()))
    } else {
        SelectMode::Exact
    };

    let source = match (args.ref1, args.ref2) {
        (Some(from), Some(to)) if args.files.is_empty() => ChangeSource::Revisions {
            repo: args.repo.unwrap_or(cwd),
            from,
            to,
        },
        _ => ChangeSource::Files(args.files),
    };

    let options = SelectOptions {
        depmap: args.depmap_json,
        source,
        mode,
        fallback: !args.no_fallback,
        output: Some(args.output.clone()),
    };

    let result = select_from_index(&index, &options, &config)?;
    if result.changed_files.is_empty() {
        println!("No changed files detected.");
    }
    println!(
        "Exported {} tests to run to {}",
        result.tests_to_run.len(),
        args.output.display()
    );

    Ok(())
}
