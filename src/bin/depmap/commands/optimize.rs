//! `depmap optimize` command

use anyhow::Result;

use crate::cli::OptimizeArgs;
use depmap::ops::optimize;

pub fn execute(args: OptimizeArgs) -> Result<()> {
    let affected = optimize(&args.depmap_json, &args.changed_files)?;
    print!("{}", affected);
    Ok(())
}
