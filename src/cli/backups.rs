use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::error::ModcfgError;
use crate::store::{BackupEntry, list_backups};

#[derive(Debug, Args)]
pub struct BackupsArgs {
    #[arg(value_name = "FILE", help = "Config file whose backups to list")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct BackupsResponse {
    pub file: PathBuf,
    pub backups: Vec<BackupEntry>,
}

pub fn run_backups(args: BackupsArgs) -> Result<BackupsResponse, ModcfgError> {
    let backups = list_backups(&args.file)?;
    Ok(BackupsResponse {
        file: args.file,
        backups,
    })
}
