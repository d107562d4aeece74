// src/sync/lock.rs

use crate::constants::{LOCK_FILE_NAME, STATE_DIR_NAME};
use crate::errors::{io_error_with_path, Error, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on a sync root, held for the duration of a run.
///
/// Released when dropped.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock at `<root>/.synccache/sync.lock` without blocking.
    ///
    /// # Errors
    /// `Error::Locked` if another run holds it.
    pub fn acquire(root: &Path) -> Result<Self> {
        let dir = root.join(STATE_DIR_NAME);
        fs::create_dir_all(&dir).map_err(|e| io_error_with_path(e, &dir))?;
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_error_with_path(e, &path))?;

        if file.try_lock_exclusive().is_err() {
            return Err(Error::Locked {
                path: path.display().to_string(),
            });
        }
        log::debug!("Acquired run lock {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::debug!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}
