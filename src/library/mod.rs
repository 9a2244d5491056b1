//! Library gate
//!
//! Every item belongs to exactly one library, and mutation is only permitted
//! while that library is editable.
//!
//! - `Library` - name + editability value
//! - `LibraryGate` - lookup contract consumed by the engine
//! - `LibraryRegistry` - provisioning and administrative editability toggle
//! - `LibraryCache` - explicit lookup cache with invalidation

mod cache;
#[allow(clippy::module_inception)]
mod library;
mod registry;

pub use cache::{CacheStats, LibraryCache};
pub use library::{Library, LibraryGate};
pub use registry::LibraryRegistry;
