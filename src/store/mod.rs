pub mod backup;
pub mod io;

use std::path::{Path, PathBuf};

use crate::dialect::{Dialect, validate_text};
use crate::error::ModcfgError;
use crate::hash::hash_text;

pub use backup::{BackupEntry, list_backups};
pub use io::{GuardState, read_guarded};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub backup: PathBuf,
    pub new_file_hash: String,
}

/// Durable save pipeline for patched config text: re-parse validation,
/// exclusive lock, rolling backup of the previous version, then an atomic
/// guarded rename. Validation runs first so a patch that produced broken
/// syntax is rejected while the previous durable version stays in place.
pub fn save_patched_text(
    path: &Path,
    patched_text: &str,
    guard: &GuardState,
    dialect: Dialect,
) -> Result<SavedFile, ModcfgError> {
    validate_text(dialect, patched_text)?;

    let _lock = io::acquire_save_lock(path)?;
    io::verify_guard(path, guard)?;
    let backup_path = backup::record_backup(path)?;
    io::write_text_atomically(path, patched_text, Some(guard))?;

    Ok(SavedFile {
        backup: backup_path,
        new_file_hash: hash_text(patched_text),
    })
}
