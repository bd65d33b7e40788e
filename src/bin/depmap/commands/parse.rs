//! `depmap parse` command

use anyhow::Result;

use crate::cli::ParseArgs;
use depmap::ops::{depmap_parse, export_index, parse_diagnostics, ParseOptions, ParseSummary};
use depmap::util::diagnostic::emit;

pub fn execute(args: ParseArgs, verbose: bool) -> Result<()> {
    let options = ParseOptions {
        build_file: args.build_ninja,
        workspace_root: args.workspace_root,
        ninja: args.ninja,
        jobs: args.jobs,
        timeout_secs: args.timeout,
        no_filter: args.no_filter,
        cache: args.cache,
        progress: !verbose,
        cancel: None,
    };

    let run = depmap_parse(&options)?;
    let exported = export_index(&run.index, run.statistics(), &args.output_dir)?;

    print!("{}", ParseSummary::new(&run));
    println!();
    println!("Wrote {}", exported.csv.display());
    println!("Wrote {}", exported.json.display());

    for diagnostic in parse_diagnostics(&run) {
        emit(&diagnostic);
    }

    Ok(())
}
