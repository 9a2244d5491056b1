//! # Lifecycle Errors
//!
//! One error type is shared by the library gate, the lifecycle aggregate and
//! the repositories. Every variant belongs to exactly one [`ErrorKind`], which
//! is what callers branch on (and what an HTTP layer maps to a status code).

use std::fmt;

use thiserror::Error;

use crate::lifecycle::Action;
use crate::version::ItemStatus;

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Error categories surfaced at the engine boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No record matches the requested uid / version / status / date
    NotFound,
    /// Name already taken, or an optimistic-lock mismatch on save
    Conflict,
    /// Requested action is not legal for the item's current state
    Validation,
    /// A business rule forbids the operation
    BusinessLogic,
    /// Persistence failure (I/O, corruption, codec)
    Storage,
}

impl ErrorKind {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::BusinessLogic => "BUSINESS_LOGIC",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    // ==================
    // NotFound
    // ==================
    /// Unknown item uid, or no record matches the selectors
    #[error("Item not found: {uid} ({selector})")]
    ItemNotFound { uid: String, selector: String },

    /// Unknown library name
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    // ==================
    // Conflict
    // ==================
    /// Another live item in the library already uses this name
    #[error("Name '{name}' already exists in library '{library}'")]
    NameExists { library: String, name: String },

    /// A library with this name is already provisioned
    #[error("Library already exists: {0}")]
    LibraryExists(String),

    /// The record this save expected to supersede is no longer current
    #[error("Stale item {uid}: loaded at revision {expected}, current is {}", display_revision(.found))]
    StaleRevision {
        uid: String,
        expected: u64,
        found: Option<u64>,
    },

    /// A new item was saved under a uid that is already taken
    #[error("Item uid already exists: {0}")]
    UidExists(String),

    // ==================
    // Validation
    // ==================
    /// The action is not among the item's possible actions
    #[error("Action '{action}' is not allowed for item {uid} in status {status}")]
    InvalidTransition {
        uid: String,
        action: Action,
        status: ItemStatus,
    },

    /// Malformed input (version string, selector combination, metadata)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Staged changes on an item that was not retrieved for update
    #[error("Item {0} was not retrieved for update and cannot be saved")]
    ReadOnlyItem(String),

    // ==================
    // BusinessLogic
    // ==================
    /// The owning library does not allow edits
    #[error("Library '{library}' is not editable ({action} on {uid})")]
    LibraryNotEditable {
        library: String,
        uid: String,
        action: Action,
    },

    /// A business rule rejected the operation
    #[error("Business rule violated for {uid}: {message}")]
    BusinessRule { uid: String, message: String },

    // ==================
    // Storage
    // ==================
    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Journal corruption detected while reading
    #[error("Journal corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Payload could not be encoded or decoded
    #[error("Payload codec error: {0}")]
    Codec(String),
}

fn display_revision(found: &Option<u64>) -> String {
    match found {
        Some(revision) => revision.to_string(),
        None => "erased".to_string(),
    }
}

impl LifecycleError {
    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::ItemNotFound { .. } | LifecycleError::LibraryNotFound(_) => {
                ErrorKind::NotFound
            }
            LifecycleError::NameExists { .. }
            | LifecycleError::LibraryExists(_)
            | LifecycleError::StaleRevision { .. }
            | LifecycleError::UidExists(_) => ErrorKind::Conflict,
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::InvalidInput(_)
            | LifecycleError::ReadOnlyItem(_) => ErrorKind::Validation,
            LifecycleError::LibraryNotEditable { .. } | LifecycleError::BusinessRule { .. } => {
                ErrorKind::BusinessLogic
            }
            LifecycleError::Storage(_)
            | LifecycleError::Corruption { .. }
            | LifecycleError::Codec(_) => ErrorKind::Storage,
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation => 400,
            ErrorKind::BusinessLogic => 400,
            ErrorKind::Storage => 500,
        }
    }

    /// True when reloading the item and repeating the operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::StaleRevision { .. })
    }

    pub(crate) fn not_found(uid: impl Into<String>, selector: impl Into<String>) -> Self {
        LifecycleError::ItemNotFound {
            uid: uid.into(),
            selector: selector.into(),
        }
    }

    pub(crate) fn business(uid: impl Into<String>, message: impl Into<String>) -> Self {
        LifecycleError::BusinessRule {
            uid: uid.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for LifecycleError {
    fn from(e: std::io::Error) -> Self {
        LifecycleError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(e: serde_json::Error) -> Self {
        LifecycleError::Codec(e.to_string())
    }
}
