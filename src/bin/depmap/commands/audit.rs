//! `depmap audit` command

use anyhow::Result;

use crate::cli::AuditArgs;
use depmap::ops::audit;

pub fn execute(args: AuditArgs) -> Result<()> {
    print!("{}", audit(&args.depmap_json)?);
    Ok(())
}
