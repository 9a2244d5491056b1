//! Persistence of lifecycle items
//!
//! This module provides:
//! - `Repository` - the contract the engine depends on
//! - `HistoryRecord` - one immutable snapshot per transition
//! - `MemoryRepository` - volatile implementation
//! - `FileRepository` - journal-backed implementation with replay on open
//! - `Session` - request-scoped guard that closes the repository on drop
//!
//! Both implementations share the same optimistic concurrency rule: a save
//! is accepted only if the item's loaded revision is still the latest one.

mod contract;
mod file;
mod history;
mod memory;
mod session;
mod store;

pub mod journal;

pub use contract::{FindQuery, ItemFilter, LibraryNames, Page, Repository};
pub use file::{FileRepository, FileRepositoryOptions};
pub use history::HistoryRecord;
pub use memory::{MemoryRepository, DEFAULT_UID_PREFIX};
pub use session::{with_session, Session};
