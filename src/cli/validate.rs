use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::dialect::{Dialect, validate_text};
use crate::error::ModcfgError;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long, value_enum, help = "Override dialect detection from the file extension")]
    pub dialect: Option<Dialect>,
    #[arg(value_name = "FILE", help = "Config file to check")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub file: PathBuf,
    pub dialect: &'static str,
    pub valid: bool,
}

pub fn run_validate(args: ValidateArgs) -> Result<ValidateResponse, ModcfgError> {
    let dialect = match args.dialect {
        Some(dialect) => dialect,
        None => Dialect::from_path(&args.file)?,
    };
    let text = fs::read_to_string(&args.file).map_err(|error| ModcfgError::io(&args.file, error))?;
    validate_text(dialect, &text)?;

    Ok(ValidateResponse {
        file: args.file,
        dialect: dialect.name(),
        valid: true,
    })
}
