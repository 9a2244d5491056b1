//! Library value and the lookup contract the engine depends on

use serde::{Deserialize, Serialize};

use crate::errors::LifecycleResult;

/// A named editability domain, e.g. "Sponsor" or "CDISC".
///
/// The name is immutable; `is_editable` reflects the administrative setting
/// at the time the value was read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Library {
    name: String,
    is_editable: bool,
}

impl Library {
    /// Creates a library value.
    pub fn new(name: impl Into<String>, is_editable: bool) -> Self {
        Self {
            name: name.into(),
            is_editable,
        }
    }

    /// Returns the library name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if items of this library may be mutated.
    #[inline]
    pub fn is_editable(&self) -> bool {
        self.is_editable
    }
}

/// Read-only library lookup.
pub trait LibraryGate: Send + Sync {
    /// True if a library with this name is provisioned.
    fn exists(&self, name: &str) -> bool;

    /// Finds a library by name, `LibraryNotFound` otherwise.
    fn find_by_name(&self, name: &str) -> LifecycleResult<Library>;
}

impl<G: LibraryGate + ?Sized> LibraryGate for std::sync::Arc<G> {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn find_by_name(&self, name: &str) -> LifecycleResult<Library> {
        (**self).find_by_name(name)
    }
}
