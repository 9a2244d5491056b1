//! Observable lifecycle events
//!
//! Events are explicit and typed; the logger only ever sees their
//! `SCREAMING_SNAKE` names.

use std::fmt;

use crate::lifecycle::Action;

/// Observable events of the lifecycle engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded and validated
    ConfigLoaded,

    // Libraries
    /// Library provisioned
    LibraryProvisioned,
    /// Library editability switched
    LibraryEditabilityChanged,

    // Item transitions
    /// New item saved in Draft 0.1
    ItemCreated,
    /// Draft edited
    ItemEdited,
    /// Draft approved
    ItemApproved,
    /// New draft opened from a final version
    NewVersionCreated,
    /// Final version retired
    ItemInactivated,
    /// Retired version reactivated
    ItemReactivated,
    /// Retired item flagged deleted
    ItemDeleted,
    /// Never-approved item removed with its history
    ItemErased,

    // Rejections
    /// Transition refused (validation / business rule / name clash)
    TransitionRejected,
    /// Save refused by the optimistic revision check
    SaveConflict,

    // Journal
    /// Journal corruption detected (FATAL)
    JournalCorruption,
    /// Frames appended by another instance applied before a save
    JournalCaughtUp,

    // Sessions
    /// Repository session opened
    SessionOpened,
    /// Repository session closed and resources released
    SessionClosed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::LibraryProvisioned => "LIBRARY_PROVISIONED",
            Event::LibraryEditabilityChanged => "LIBRARY_EDITABILITY_CHANGED",

            Event::ItemCreated => "ITEM_CREATED",
            Event::ItemEdited => "ITEM_EDITED",
            Event::ItemApproved => "ITEM_APPROVED",
            Event::NewVersionCreated => "NEW_VERSION_CREATED",
            Event::ItemInactivated => "ITEM_INACTIVATED",
            Event::ItemReactivated => "ITEM_REACTIVATED",
            Event::ItemDeleted => "ITEM_DELETED",
            Event::ItemErased => "ITEM_ERASED",

            Event::TransitionRejected => "TRANSITION_REJECTED",
            Event::SaveConflict => "SAVE_CONFLICT",

            Event::JournalCorruption => "JOURNAL_CORRUPTION",
            Event::JournalCaughtUp => "JOURNAL_CAUGHT_UP",

            Event::SessionOpened => "SESSION_OPENED",
            Event::SessionClosed => "SESSION_CLOSED",
        }
    }

    /// The event emitted after an action was persisted.
    ///
    /// `erased` distinguishes the two outcomes of a delete.
    pub fn for_action(action: Action, erased: bool) -> Self {
        match action {
            Action::Edit => Event::ItemEdited,
            Action::Approve => Event::ItemApproved,
            Action::NewVersion => Event::NewVersionCreated,
            Action::Inactivate => Event::ItemInactivated,
            Action::Reactivate => Event::ItemReactivated,
            Action::Delete if erased => Event::ItemErased,
            Action::Delete => Event::ItemDeleted,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::JournalCorruption)
    }

    /// Returns true if this event reports a refused request
    pub fn is_rejection(&self) -> bool {
        matches!(self, Event::TransitionRejected | Event::SaveConflict)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
