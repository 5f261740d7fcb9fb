use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::dialect::{Dialect, parse_text};
use crate::error::ModcfgError;
use crate::value::{ValueDiff, diff_values};

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[arg(long, value_enum, help = "Override dialect detection from the file extensions")]
    pub dialect: Option<Dialect>,
    #[arg(value_name = "BEFORE", help = "Original config file")]
    pub before: PathBuf,
    #[arg(value_name = "AFTER", help = "Edited config file")]
    pub after: PathBuf,
}

/// The emitted change list is shaped to feed straight into `patch --json`.
#[derive(Debug, Serialize)]
pub struct DiffResponse {
    pub before: PathBuf,
    pub after: PathBuf,
    pub dialect: &'static str,
    pub changes: Vec<ValueDiff>,
}

pub fn run_diff(args: DiffArgs) -> Result<DiffResponse, ModcfgError> {
    let dialect = match args.dialect {
        Some(dialect) => dialect,
        None => Dialect::from_path(&args.before)?,
    };

    let before_text =
        fs::read_to_string(&args.before).map_err(|error| ModcfgError::io(&args.before, error))?;
    let after_text =
        fs::read_to_string(&args.after).map_err(|error| ModcfgError::io(&args.after, error))?;

    let before_value = parse_text(dialect, &before_text)?;
    let after_value = parse_text(dialect, &after_text)?;

    Ok(DiffResponse {
        before: args.before,
        after: args.after,
        dialect: dialect.name(),
        changes: diff_values(&before_value, &after_value),
    })
}
