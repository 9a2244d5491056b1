//! Cross-process journal lock
//!
//! Every repository instance on a data directory appends to the same
//! `journal.log`. A save holds an exclusive `flock` on the journal from
//! catch-up to append, so two instances can never both extend the file from
//! the same sequence number. The lock is released when the guard drops.
//!
//! On non-Unix targets the lock is a no-op.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use crate::errors::{LifecycleError, LifecycleResult};

/// Exclusive lock on the journal file, held until dropped.
pub struct JournalLock {
    file: File,
}

impl JournalLock {
    /// Blocks until the exclusive lock on `path` is granted, creating the
    /// journal if it does not exist yet.
    pub fn acquire(path: &Path) -> LifecycleResult<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LifecycleError::Storage(format!(
                    "Failed to open journal {} for locking: {}",
                    path.display(),
                    e
                ))
            })?;
        lock_exclusive(&file).map_err(|e| {
            LifecycleError::Storage(format!(
                "Failed to lock journal {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { file })
    }
}

impl Drop for JournalLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well
        let _ = unlock(&self.file);
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn lock_exclusive(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    loop {
        // SAFETY: `fd` belongs to `file`, which outlives this call, and
        // `LOCK_EX` is a valid `flock` operation.
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn unlock(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: `fd` belongs to `file`, which outlives this call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn is_locked(path: &Path) -> bool {
        let file = File::open(path).unwrap();
        // SAFETY: `file` is open for the duration of both calls.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            // SAFETY: as above.
            unsafe {
                libc::flock(file.as_raw_fd(), libc::LOCK_UN);
            }
        }
        rc != 0
    }

    #[test]
    fn test_lock_creates_journal_and_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal").join("journal.log");

        let lock = JournalLock::acquire(&path).unwrap();
        assert!(path.exists());
        assert!(is_locked(&path));

        drop(lock);
        assert!(!is_locked(&path));
    }

    #[test]
    fn test_second_holder_waits_for_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.log");
        let lock = JournalLock::acquire(&path).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let path = path.clone();
            thread::spawn(move || {
                let _lock = JournalLock::acquire(&path).unwrap();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(lock);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }
}
