//! Append-only change journal of the file repository
//!
//! Layout: `<data_dir>/journal/journal.log`, a sequence of checksummed
//! frames each holding one JSON `JournalEntry`. The journal is the only
//! durable state: opening a `FileRepository` replays it from the start.

mod checksum;
mod entry;
mod frame;
mod lock;
mod reader;
mod writer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::LifecycleError;

pub use checksum::{compute_checksum, verify_checksum};
pub use entry::{JournalChange, JournalEntry};
pub use frame::JournalFrame;
pub use lock::JournalLock;
pub use reader::JournalReader;
pub use writer::JournalWriter;

/// Durability of journal appends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalSync {
    /// fsync after every append
    #[default]
    Fsync,
    /// leave flushing to the OS
    None,
}

impl fmt::Display for JournalSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalSync::Fsync => write!(f, "fsync"),
            JournalSync::None => write!(f, "none"),
        }
    }
}

impl FromStr for JournalSync {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fsync" => Ok(JournalSync::Fsync),
            "none" => Ok(JournalSync::None),
            _ => Err(LifecycleError::InvalidInput(format!(
                "unknown journal sync mode '{}'",
                s
            ))),
        }
    }
}

/// `<data_dir>/journal/journal.log`
pub fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join("journal").join("journal.log")
}
