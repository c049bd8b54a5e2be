use crate::error::OrchestratorError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// The "global process-level migration lock file" (§4.7, §5) preventing two
/// orchestrators from running against the same target concurrently. Held for
/// the lifetime of a `MigrationLock`; released on drop (or process exit).
pub struct MigrationLock {
    path: PathBuf,
    file: File,
}

impl MigrationLock {
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)
            .map_err(|source| OrchestratorError::LockIo {
                path: path.display().to_string(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(MigrationLock { path, file }),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                Err(OrchestratorError::LockHeld(path.display().to_string()))
            }
            Err(source) => Err(OrchestratorError::LockIo {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquire_on_same_path_fails_while_first_is_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("migration.lock");

        let first = MigrationLock::acquire(&path).expect("first lock succeeds");
        let second = MigrationLock::acquire(&path);
        assert!(matches!(second, Err(OrchestratorError::LockHeld(_))));

        drop(first);
        let third = MigrationLock::acquire(&path);
        assert!(third.is_ok());
    }
}
