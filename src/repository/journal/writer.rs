//! Journal writer
//!
//! - Append-only, single file
//! - With `JournalSync::Fsync` every append is followed by fsync, and the
//!   save is acknowledged only after it succeeded
//! - Sequence numbers are assigned here and never reused
//! - A failed append truncates the file back to where the frame started, so
//!   a frame is either fully down or absent

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::frame::JournalFrame;
use super::JournalSync;
use crate::errors::{LifecycleError, LifecycleResult};

/// Appends frames to `journal.log`.
pub struct JournalWriter {
    path: PathBuf,
    file: File,
    next_sequence: u64,
    sync: JournalSync,
}

impl JournalWriter {
    /// Opens (or creates) the journal for appending.
    ///
    /// `next_sequence` comes from the replay that preceded the open; the
    /// writer does not rescan the file.
    pub fn open(path: &Path, next_sequence: u64, sync: JournalSync) -> LifecycleResult<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                LifecycleError::Storage(format!(
                    "Failed to create journal directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LifecycleError::Storage(format!(
                    "Failed to open journal {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_sequence,
            sync,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence
    }

    /// Current length of the journal file.
    pub fn file_len(&self) -> LifecycleResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Appends one body as a frame, returning `(sequence, bytes written)`.
    ///
    /// # Errors
    ///
    /// `Storage` if the write or the fsync fails. The partial frame is cut
    /// off again; if that fails too the error says so and the file must not
    /// be appended to before it has been replayed.
    pub fn append(&mut self, body: Vec<u8>) -> LifecycleResult<(u64, u64)> {
        let sequence = self.next_sequence;
        let bytes = JournalFrame::new(sequence, body).serialize();
        let start = self.file_len()?;

        let written = self
            .file
            .write_all(&bytes)
            .map_err(|e| {
                LifecycleError::Storage(format!(
                    "Failed to write journal frame {}: {}",
                    sequence, e
                ))
            })
            .and_then(|()| match self.sync {
                JournalSync::Fsync => self.fsync(),
                JournalSync::None => Ok(()),
            });
        if let Err(err) = written {
            return Err(self.rollback(start, err));
        }

        // Only advance once the frame is down
        self.next_sequence += 1;
        Ok((sequence, bytes.len() as u64))
    }

    fn rollback(&self, start: u64, err: LifecycleError) -> LifecycleError {
        let truncated = self.file.set_len(start).and_then(|()| self.file.sync_all());
        match truncated {
            Ok(()) => err,
            Err(e) => LifecycleError::Storage(format!(
                "{}; rolling back to offset {} also failed: {}",
                err, start, e
            )),
        }
    }

    /// Explicitly fsync the journal file.
    pub fn fsync(&self) -> LifecycleResult<()> {
        self.file.sync_all().map_err(|e| {
            LifecycleError::Storage(format!("Journal fsync failed: {}", e))
        })
    }
}
