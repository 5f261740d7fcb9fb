use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::ModcfgError;

pub const BACKUP_DIR_NAME: &str = ".modcfg-backups";
pub const BACKUP_HISTORY_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub created_nanos: u128,
    pub size: u64,
}

fn backup_directory(path: &Path) -> PathBuf {
    super::io::resolve_parent_directory(path).join(BACKUP_DIR_NAME)
}

/// Copies the current file content into the rolling backup directory and
/// prunes history beyond `BACKUP_HISTORY_DEPTH`. Returns the new backup's
/// path so save responses can report where the previous version went.
pub fn record_backup(path: &Path) -> Result<PathBuf, ModcfgError> {
    let directory = backup_directory(path);
    fs::create_dir_all(&directory).map_err(|error| ModcfgError::io(&directory, error))?;

    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .ok_or_else(|| ModcfgError::InvalidRequest {
            message: format!("Cannot back up path without a file name: '{}'", path.display()),
        })?;
    let mut stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let backup_path = loop {
        let candidate = directory.join(format!("{file_name}.{stamp}.bak"));
        if !candidate.exists() {
            break candidate;
        }
        stamp += 1;
    };

    fs::copy(path, &backup_path).map_err(|error| ModcfgError::io(&backup_path, error))?;
    prune_history(path, BACKUP_HISTORY_DEPTH)?;
    Ok(backup_path)
}

/// Lists retrievable backups for `path`, newest first.
pub fn list_backups(path: &Path) -> Result<Vec<BackupEntry>, ModcfgError> {
    let directory = backup_directory(path);
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default();
    let prefix = format!("{file_name}.");

    let mut entries = Vec::new();
    let listing = match fs::read_dir(&directory) {
        Ok(listing) => listing,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
        Err(error) => return Err(ModcfgError::io(&directory, error)),
    };

    for entry in listing {
        let entry = entry.map_err(|error| ModcfgError::io(&directory, error))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".bak"))
        else {
            continue;
        };
        let Ok(created_nanos) = stamp.parse::<u128>() else {
            continue;
        };
        let size = entry
            .metadata()
            .map_err(|error| ModcfgError::io(&entry.path(), error))?
            .len();
        entries.push(BackupEntry {
            path: entry.path(),
            created_nanos,
            size,
        });
    }

    entries.sort_by(|a, b| b.created_nanos.cmp(&a.created_nanos));
    Ok(entries)
}

fn prune_history(path: &Path, keep: usize) -> Result<(), ModcfgError> {
    let entries = list_backups(path)?;
    for stale in entries.iter().skip(keep) {
        fs::remove_file(&stale.path).map_err(|error| ModcfgError::io(&stale.path, error))?;
    }
    Ok(())
}
