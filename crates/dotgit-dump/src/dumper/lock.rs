//! Exclusive ownership of a destination directory.

use std::fs::{File, OpenOptions, TryLockError};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DumpError, Result};

/// Name of the lock file created inside the destination.
pub const LOCK_FILE: &str = ".dotgit.lock";

/// Opens after which a lock file that keeps being replaced counts as held.
const MAX_ATTEMPTS: usize = 3;

/// An advisory lock on `<dest>/.dotgit.lock`, released and removed on drop.
///
/// The holder unlinks the file before unlocking it, so a job that opened the
/// old file and locks it afterwards finds the path gone (or pointing at a new
/// file) and starts over.
#[derive(Debug)]
pub struct DestinationLock {
    file: File,
    path: PathBuf,
}

impl DestinationLock {
    /// Takes the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Locked` if another job holds it, or
    /// `DumpError::Io` if the lock file cannot be created.
    pub fn acquire(dest: &Path) -> Result<Self> {
        let path = dest.join(LOCK_FILE);

        for _ in 0..MAX_ATTEMPTS {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;

            if let Some(lock) = Self::claim(file, &path, dest)? {
                debug!("Locked {}", dest.display());
                return Ok(lock);
            }
            debug!("{} was replaced while locking, retrying", path.display());
        }

        Err(DumpError::Locked(dest.to_path_buf()))
    }

    /// Locks an opened lock file. Returns `None` when `path` no longer names
    /// that file; the handle is dropped, which releases it.
    fn claim(file: File, path: &Path, dest: &Path) -> Result<Option<Self>> {
        match file.try_lock() {
            Ok(()) => {},
            Err(TryLockError::WouldBlock) => return Err(DumpError::Locked(dest.to_path_buf())),
            Err(TryLockError::Error(e)) => return Err(DumpError::Io(e)),
        }

        if !still_linked(&file, path)? {
            return Ok(None);
        }
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// Open files cannot be unlinked on Windows.
#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> Result<bool> {
    Ok(path.exists())
}

impl Drop for DestinationLock {
    fn drop(&mut self) {
        // Unlink first: anyone locking the old file afterwards must see it gone.
        let _ = std::fs::remove_file(&self.path);
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(path: &Path) -> File {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn test_second_lock_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let lock = DestinationLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE).is_file());

        let err = DestinationLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, DumpError::Locked(_)));

        drop(lock);
        assert!(!dir.path().join(LOCK_FILE).exists());
        DestinationLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_handle_opened_before_release_cannot_claim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        let first = DestinationLock::acquire(dir.path()).unwrap();
        let stale = open(&path);
        drop(first);

        // The old file is unlinked, so locking it grants nothing.
        assert!(DestinationLock::claim(stale, &path, dir.path()).unwrap().is_none());

        let _second = DestinationLock::acquire(dir.path()).unwrap();
        let err = DestinationLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, DumpError::Locked(_)));
    }

    #[test]
    fn test_handle_of_replaced_file_cannot_claim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE);

        let stale = open(&path);
        std::fs::remove_file(&path).unwrap();
        let _current = DestinationLock::acquire(dir.path()).unwrap();

        assert!(DestinationLock::claim(stale, &path, dir.path()).unwrap().is_none());
    }
}
