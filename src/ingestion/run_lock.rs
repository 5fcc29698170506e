use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::errors::ScanError;

/// Exclusive marker that one scan cycle is running. The lock file is created
/// atomically and removed when the guard drops.
///
/// A lock older than the stale window is assumed to belong to a crashed
/// process and is taken over.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: impl Into<PathBuf>, stale_secs: u64) -> Result<Self, ScanError> {
        let path = path.into();

        match Self::create(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(&path, Duration::from_secs(stale_secs)) {
                    return Err(ScanError::Locked(path.display().to_string()));
                }
                tracing::warn!(path = %path.display(), "Reclaiming stale run lock");
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Self::create(&path).map_err(|e| {
                    if e.kind() == ErrorKind::AlreadyExists {
                        ScanError::Locked(path.display().to_string())
                    } else {
                        ScanError::Lock(e)
                    }
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to release run lock");
        }
    }
}

fn is_stale(path: &Path, max_age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > max_age)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.lock");

        let first = RunLock::acquire(&path, 900).unwrap();
        let second = RunLock::acquire(&path, 900);
        assert!(matches!(second, Err(ScanError::Locked(_))));

        drop(first);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path, 900).is_ok());
    }

    #[test]
    fn test_lock_file_holds_pid() {
        let dir = tempfile::tempdir().unwrap();
        let lock = RunLock::acquire(dir.path().join("scan.lock"), 900).unwrap();
        let raw = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(raw.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.lock");
        fs::write(&path, "12345\n").unwrap();

        std::thread::sleep(Duration::from_millis(1100));
        let lock = RunLock::acquire(&path, 0).unwrap();
        assert!(lock.path().exists());
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("scan.lock");
        assert!(matches!(RunLock::acquire(path, 900), Err(ScanError::Lock(_))));
    }
}
