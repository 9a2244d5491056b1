//! LifecycleItem - the versioned aggregate
//!
//! Owns one item's current payload and version metadata. State changes only
//! happen through the transition methods, each of which validates everything
//! first and then stages exactly one change for the repository to persist.
//! A failed transition leaves the aggregate untouched.
//!
//! ```text
//!            edit
//!           ┌────┐
//!           ▼    │   approve            inactivate
//!  create ─► DRAFT ──────────► FINAL ─────────────► RETIRED
//!              ▲                 │  ◄─────────────    │
//!              └── new_version ──┘     reactivate     │
//!                                                     ▼
//!  delete: DRAFT with major 0 (erase) or RETIRED (soft delete)
//! ```

use std::collections::BTreeSet;

use super::capability::{ItemPayload, NameUniquenessChecker, UidGenerator};
use super::{policy, Action};
use crate::errors::{LifecycleError, LifecycleResult};
use crate::library::Library;
use crate::repository::HistoryRecord;
use crate::version::{
    ItemStatus, VersionMetadata, FINAL_VERSION_LABEL, NEW_VERSION_LABEL,
    REACTIVATED_VERSION_LABEL, RETIRED_VERSION_LABEL,
};

/// A change staged by a transition and not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedChange<P> {
    /// Append a new history record, superseding the current one.
    Record(HistoryRecord<P>),
    /// Flag the item deleted, keeping its history.
    SoftDelete,
    /// Remove the item and its history entirely.
    Erase,
}

/// Generic lifecycle aggregate over a payload type `P`.
#[derive(Debug, Clone)]
pub struct LifecycleItem<P> {
    uid: String,
    library: Library,
    metadata: VersionMetadata,
    payload: P,
    is_deleted: bool,
    /// Revision of the record `metadata` and `payload` belong to.
    revision: u64,
    /// Revision that was current in storage when this item was loaded.
    loaded_revision: Option<u64>,
    for_update: bool,
    is_current: bool,
    staged: Vec<StagedChange<P>>,
}

impl<P: ItemPayload> LifecycleItem<P> {
    /// Creates a new item in Draft `0.1`.
    ///
    /// # Errors
    ///
    /// - `LibraryNotEditable` if the library is locked
    /// - `NameExists` if `names` reports the payload name as taken
    pub fn create<U, N>(
        library: Library,
        payload: P,
        author: &str,
        uids: &U,
        names: &N,
    ) -> LifecycleResult<Self>
    where
        U: UidGenerator + ?Sized,
        N: NameUniquenessChecker + ?Sized,
    {
        if !library.is_editable() {
            return Err(LifecycleError::business(
                payload.name(),
                format!(
                    "Creating objects in non-editable library '{}' is forbidden",
                    library.name()
                ),
            ));
        }
        if names.name_exists(payload.name())? {
            return Err(LifecycleError::NameExists {
                library: library.name().to_string(),
                name: payload.name().to_string(),
            });
        }

        let uid = uids.generate_uid();
        let metadata = VersionMetadata::initial(author);
        let record = HistoryRecord::new(uid.clone(), 1, metadata.clone(), payload.clone());

        Ok(Self {
            uid,
            library,
            metadata,
            payload,
            is_deleted: false,
            revision: 1,
            loaded_revision: None,
            for_update: true,
            is_current: true,
            staged: vec![StagedChange::Record(record)],
        })
    }

    /// Rebuilds an aggregate from a stored record.
    ///
    /// Intended for repository implementations.
    pub fn from_repository_values(
        library: Library,
        record: HistoryRecord<P>,
        current_revision: u64,
        is_deleted: bool,
        for_update: bool,
    ) -> Self {
        let (uid, revision, metadata, payload) = record.into_parts();
        Self {
            uid,
            library,
            metadata,
            payload,
            is_deleted,
            revision,
            loaded_revision: Some(current_revision),
            for_update,
            is_current: revision == current_revision,
            staged: Vec::new(),
        }
    }

    // ==================
    // Transitions
    // ==================

    /// Replaces the payload of a draft, bumping the minor version.
    ///
    /// Final items must go through [`LifecycleItem::new_version`] first.
    pub fn edit<N>(
        &mut self,
        author: &str,
        payload: P,
        change_description: &str,
        names: &N,
    ) -> LifecycleResult<()>
    where
        N: NameUniquenessChecker + ?Sized,
    {
        self.guard(Action::Edit)?;
        if payload.name() != self.payload.name() && names.name_exists(payload.name())? {
            return Err(LifecycleError::NameExists {
                library: self.library.name().to_string(),
                name: payload.name().to_string(),
            });
        }
        self.stage_record(
            ItemStatus::Draft,
            author,
            Some(change_description.to_string()),
            Some(payload),
        );
        Ok(())
    }

    /// Approves the current draft: Draft → Final, `(major + 1).0`.
    pub fn approve(&mut self, author: &str, change_description: Option<&str>) -> LifecycleResult<()> {
        self.guard(Action::Approve)?;
        self.stage_record(
            ItemStatus::Final,
            author,
            Some(change_description.unwrap_or(FINAL_VERSION_LABEL).to_string()),
            None,
        );
        Ok(())
    }

    /// Opens a new draft from a final version: `major.(minor + 1)`.
    pub fn new_version(
        &mut self,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<()> {
        self.guard(Action::NewVersion)?;
        self.stage_record(
            ItemStatus::Draft,
            author,
            Some(change_description.unwrap_or(NEW_VERSION_LABEL).to_string()),
            None,
        );
        Ok(())
    }

    /// Retires a final version. The version label is unchanged.
    pub fn inactivate(
        &mut self,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<()> {
        self.guard(Action::Inactivate)?;
        self.stage_record(
            ItemStatus::Retired,
            author,
            Some(change_description.unwrap_or(RETIRED_VERSION_LABEL).to_string()),
            None,
        );
        Ok(())
    }

    /// Brings a retired item back to Final. The version label is unchanged.
    pub fn reactivate(
        &mut self,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<()> {
        self.guard(Action::Reactivate)?;
        self.stage_record(
            ItemStatus::Final,
            author,
            Some(change_description.unwrap_or(REACTIVATED_VERSION_LABEL).to_string()),
            None,
        );
        Ok(())
    }

    /// Deletes the item.
    ///
    /// A never-approved item (`major == 0`) is erased together with its
    /// history; a retired item is flagged deleted and keeps its history.
    pub fn delete(&mut self) -> LifecycleResult<()> {
        self.ensure_not_deleted()?;
        if !policy::is_deletable(self.metadata.status(), self.metadata.major()) {
            return Err(LifecycleError::business(
                &self.uid,
                format!(
                    "item has been accepted or is not retired (status {}, version {})",
                    self.metadata.status(),
                    self.metadata.version()
                ),
            ));
        }
        self.ensure_editable(Action::Delete)?;

        let change = if self.metadata.major() == 0 {
            StagedChange::Erase
        } else {
            StagedChange::SoftDelete
        };
        self.is_deleted = true;
        self.staged.push(change);
        Ok(())
    }

    // ==================
    // Accessors
    // ==================

    /// Returns the item uid.
    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the owning library.
    #[inline]
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Returns the current version metadata.
    #[inline]
    pub fn metadata(&self) -> &VersionMetadata {
        &self.metadata
    }

    /// Returns the current payload.
    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// True once the item has been deleted.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Revision of the record this aggregate currently reflects.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision that was current in storage when this item was loaded,
    /// `None` for an item that has never been saved.
    #[inline]
    pub fn loaded_revision(&self) -> Option<u64> {
        self.loaded_revision
    }

    /// True if the item was retrieved with update intent (or newly created).
    #[inline]
    pub fn is_for_update(&self) -> bool {
        self.for_update
    }

    /// True if the loaded record was the live one.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.is_current
    }

    /// Actions legal for the item right now.
    pub fn possible_actions(&self) -> BTreeSet<Action> {
        if self.is_deleted {
            return BTreeSet::new();
        }
        policy::possible_actions(self.metadata.status(), self.metadata.major())
    }

    /// True if transitions were applied since the last save.
    pub fn has_pending_changes(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Changes staged since the last save, oldest first.
    pub fn pending_changes(&self) -> &[StagedChange<P>] {
        &self.staged
    }

    /// Called by a repository after the staged changes were persisted.
    pub fn mark_persisted(&mut self) {
        self.staged.clear();
        self.loaded_revision = Some(self.revision);
        self.is_current = true;
    }

    // ==================
    // Guards
    // ==================

    fn guard(&self, action: Action) -> LifecycleResult<()> {
        self.ensure_not_deleted()?;
        if !policy::is_allowed(action, self.metadata.status(), self.metadata.major()) {
            return Err(LifecycleError::InvalidTransition {
                uid: self.uid.clone(),
                action,
                status: self.metadata.status(),
            });
        }
        self.ensure_editable(action)
    }

    fn ensure_not_deleted(&self) -> LifecycleResult<()> {
        if self.is_deleted {
            return Err(LifecycleError::business(&self.uid, "Cannot use deleted object"));
        }
        Ok(())
    }

    fn ensure_editable(&self, action: Action) -> LifecycleResult<()> {
        if P::editable_in_locked_library() || self.library.is_editable() {
            return Ok(());
        }
        Err(LifecycleError::LibraryNotEditable {
            library: self.library.name().to_string(),
            uid: self.uid.clone(),
            action,
        })
    }

    fn stage_record(
        &mut self,
        status: ItemStatus,
        author: &str,
        change_description: Option<String>,
        payload: Option<P>,
    ) {
        let metadata = self.metadata.successor(status, author, change_description);
        if let Some(payload) = payload {
            self.payload = payload;
        }
        self.revision += 1;
        self.metadata = metadata;
        self.staged.push(StagedChange::Record(HistoryRecord::new(
            self.uid.clone(),
            self.revision,
            self.metadata.clone(),
            self.payload.clone(),
        )));
    }
}
