use std::fs::{self, File, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use fs2::FileExt;

use crate::error::ModcfgError;
use crate::hash::hash_bytes;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Exclusive advisory lock held for the duration of one save; dropped with
/// the struct.
#[derive(Debug)]
pub struct SaveFileLock {
    _file: File,
}

pub fn acquire_save_lock(path: &Path) -> Result<SaveFileLock, ModcfgError> {
    let file = OpenOptions::new()
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|error| ModcfgError::io(path, error))?;

    file.try_lock_exclusive().map_err(|error| {
        if error.kind() == std::io::ErrorKind::WouldBlock {
            ModcfgError::ResourceBusy {
                path: path.display().to_string(),
            }
        } else {
            ModcfgError::io(path, error)
        }
    })?;

    Ok(SaveFileLock { _file: file })
}

/// Snapshot of a file's identity and content hash taken at read time, used
/// to refuse a save when the file changed underneath the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardState {
    fingerprint: PathFingerprint,
    pub source_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PathFingerprint {
    #[cfg(unix)]
    device: u64,
    #[cfg(unix)]
    inode: u64,
    length: u64,
    modified_nanos: Option<u128>,
}

fn capture_fingerprint(path: &Path) -> Result<PathFingerprint, ModcfgError> {
    let metadata = fs::symlink_metadata(path).map_err(|error| ModcfgError::io(path, error))?;

    if metadata.file_type().is_symlink() {
        return Err(ModcfgError::InvalidRequest {
            message: format!(
                "Refusing to edit config through symbolic link '{}'",
                path.display()
            ),
        });
    }

    let modified_nanos = metadata
        .modified()
        .ok()
        .and_then(|timestamp| timestamp.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos());

    Ok(PathFingerprint {
        #[cfg(unix)]
        device: metadata.dev(),
        #[cfg(unix)]
        inode: metadata.ino(),
        length: metadata.len(),
        modified_nanos,
    })
}

/// Reads the file and captures the guard state the eventual save will be
/// verified against.
pub fn read_guarded(path: &Path) -> Result<(String, GuardState), ModcfgError> {
    let fingerprint = capture_fingerprint(path)?;
    let bytes = fs::read(path).map_err(|error| ModcfgError::io(path, error))?;
    let text = String::from_utf8(bytes).map_err(|_| ModcfgError::InvalidRequest {
        message: format!("Config file '{}' is not valid UTF-8", path.display()),
    })?;
    let guard = GuardState {
        fingerprint,
        source_hash: hash_bytes(text.as_bytes()),
    };
    Ok((text, guard))
}

pub fn verify_guard(path: &Path, expected: &GuardState) -> Result<(), ModcfgError> {
    let current_fingerprint = capture_fingerprint(path)?;
    if current_fingerprint != expected.fingerprint {
        return Err(ModcfgError::PathChanged {
            path: path.display().to_string(),
        });
    }

    let current_bytes = fs::read(path).map_err(|error| ModcfgError::io(path, error))?;
    let current_hash = hash_bytes(&current_bytes);
    if current_hash != expected.source_hash {
        return Err(ModcfgError::PreconditionFailed {
            expected_hash: expected.source_hash.clone(),
            actual_hash: current_hash,
        });
    }

    Ok(())
}

/// Writes `contents` through an adjacent temp file and an atomic rename, so
/// readers observe either the old version or the new one, never a partial
/// write. The guard, when given, is re-verified after the temp file is
/// durable and immediately before the rename.
pub fn write_text_atomically(
    path: &Path,
    contents: &str,
    expected_guard: Option<&GuardState>,
) -> Result<(), ModcfgError> {
    let target_permissions = fs::metadata(path)
        .map_err(|error| ModcfgError::io(path, error))?
        .permissions();
    let (temp_path, mut temp_file) = create_temp_file_adjacent(path)?;

    let result = (|| {
        temp_file
            .write_all(contents.as_bytes())
            .map_err(|error| ModcfgError::io(&temp_path, error))?;
        temp_file
            .sync_all()
            .map_err(|error| ModcfgError::io(&temp_path, error))?;

        if let Some(guard) = expected_guard {
            verify_guard(path, guard)?;
        }

        fs::set_permissions(&temp_path, target_permissions.clone())
            .map_err(|error| ModcfgError::io(&temp_path, error))?;
        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|error| ModcfgError::io(path, error))?;
        sync_parent_directory(path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn create_temp_file_adjacent(path: &Path) -> Result<(PathBuf, File), ModcfgError> {
    let parent = resolve_parent_directory(path);
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("modcfg-target");

    for _ in 0..64 {
        let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        let temp_path = parent.join(format!(".{file_name}.modcfg-tmp-{nanos}-{counter}"));

        match OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
        {
            Ok(file) => return Ok((temp_path, file)),
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(error) => return Err(ModcfgError::io(&temp_path, error)),
        }
    }

    Err(ModcfgError::InvalidRequest {
        message: format!(
            "Failed to allocate an adjacent temporary file for '{}'",
            path.display()
        ),
    })
}

pub(super) fn resolve_parent_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn sync_parent_directory(path: &Path) -> Result<(), ModcfgError> {
    #[cfg(unix)]
    {
        let parent = resolve_parent_directory(path);
        let handle = File::open(&parent).map_err(|error| ModcfgError::io(&parent, error))?;
        handle
            .sync_all()
            .map_err(|error| ModcfgError::io(&parent, error))
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{acquire_save_lock, read_guarded, verify_guard, write_text_atomically};
    use crate::error::ModcfgError;

    #[test]
    fn atomic_write_replaces_content_and_leaves_no_temp_files() {
        let directory = tempfile::tempdir().expect("temp dir should be created");
        let target = directory.path().join("config.toml");
        fs::write(&target, "key = 1\n").expect("seed write should succeed");

        write_text_atomically(&target, "key = 2\n", None).expect("atomic write should succeed");

        assert_eq!(
            fs::read_to_string(&target).expect("target should be readable"),
            "key = 2\n"
        );
        let leftovers: Vec<_> = fs::read_dir(directory.path())
            .expect("dir should list")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains("modcfg-tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files should be cleaned up");
    }

    #[test]
    fn guard_detects_content_changed_between_read_and_write() {
        let directory = tempfile::tempdir().expect("temp dir should be created");
        let target = directory.path().join("config.json");
        fs::write(&target, "{\"a\": 1}").expect("seed write should succeed");

        let (_, guard) = read_guarded(&target).expect("guarded read should succeed");
        fs::write(&target, "{\"a\": 2}").expect("outside write should succeed");

        let error = verify_guard(&target, &guard).expect_err("stale guard should be rejected");
        assert!(matches!(
            error,
            ModcfgError::PreconditionFailed { .. } | ModcfgError::PathChanged { .. }
        ));
    }

    #[test]
    fn second_lock_on_the_same_file_reports_resource_busy() {
        let directory = tempfile::tempdir().expect("temp dir should be created");
        let target = directory.path().join("config.json5");
        fs::write(&target, "{}").expect("seed write should succeed");

        let _held = acquire_save_lock(&target).expect("first lock should succeed");
        let error = acquire_save_lock(&target).expect_err("second lock should be refused");
        assert!(matches!(error, ModcfgError::ResourceBusy { .. }));
    }
}
