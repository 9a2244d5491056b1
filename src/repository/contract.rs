//! Repository contract
//!
//! The persistence abstraction the lifecycle engine depends on. Repositories
//! take `&self` and guard their state internally, so one instance can be
//! shared across threads behind an `Arc`.

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use super::HistoryRecord;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::lifecycle::{ItemPayload, LifecycleItem, NameUniquenessChecker, UidGenerator};
use crate::version::{ItemStatus, VersionMetadata, VersionNumber};

/// Selectors for [`Repository::find_by_uid`].
///
/// All given selectors must match; among matching records the newest one
/// wins. Without selectors the latest record is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    pub version: Option<VersionNumber>,
    pub status: Option<ItemStatus>,
    /// Newest record that had started at or before this instant.
    pub at_date: Option<DateTime<Utc>>,
    /// Update intent. Only valid for the latest record.
    pub for_update: bool,
}

impl FindQuery {
    /// The latest record, read-only.
    pub fn latest() -> Self {
        Self::default()
    }

    /// The latest record, retrieved for update.
    pub fn for_update() -> Self {
        Self {
            for_update: true,
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: VersionNumber) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn at(mut self, at_date: DateTime<Utc>) -> Self {
        self.at_date = Some(at_date);
        self
    }

    /// True if any of version / status / date is set.
    pub fn has_selectors(&self) -> bool {
        self.version.is_some() || self.status.is_some() || self.at_date.is_some()
    }

    /// Rejects update intent combined with selectors.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.for_update && self.has_selectors() {
            return Err(LifecycleError::InvalidInput(
                "retrieval for update is supported only for the latest version".to_string(),
            ));
        }
        Ok(())
    }

    /// True if `metadata` satisfies every selector.
    pub fn matches(&self, metadata: &VersionMetadata) -> bool {
        self.version.map_or(true, |v| metadata.version() == v)
            && self.status.map_or(true, |s| metadata.status() == s)
            && self.at_date.map_or(true, |at| metadata.start_date() <= at)
    }
}

impl fmt::Display for FindQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_selectors() {
            return write!(f, "latest");
        }
        let mut parts = Vec::new();
        if let Some(version) = self.version {
            parts.push(format!("version={}", version));
        }
        if let Some(status) = self.status {
            parts.push(format!("status={}", status));
        }
        if let Some(at) = self.at_date {
            parts.push(format!("at={}", at.to_rfc3339()));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Filter for [`Repository::find_all`]. Deleted items are never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub library: Option<String>,
    /// Matches the current status of the item.
    pub status: Option<ItemStatus>,
}

/// One page of a listing. `size == 0` means everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub size: usize,
}

impl Page {
    pub fn all() -> Self {
        Self { number: 1, size: 0 }
    }

    pub fn new(number: usize, size: usize) -> Self {
        Self { number, size }
    }

    /// Applies this page to an already ordered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.size == 0 {
            return items;
        }
        let skip = self.number.saturating_sub(1).saturating_mul(self.size);
        items.into_iter().skip(skip).take(self.size).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::all()
    }
}

/// Persistence contract of the lifecycle engine.
pub trait Repository<P: ItemPayload>: UidGenerator + Send + Sync {
    /// Loads an item. `query.for_update` marks the intent to save it later.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound` if the uid is unknown or no record matches
    /// - `InvalidInput` if update intent is combined with selectors
    fn find_by_uid(&self, uid: &str, query: &FindQuery) -> LifecycleResult<LifecycleItem<P>>;

    /// Persists the changes staged on `item`.
    ///
    /// Fails with `StaleRevision` if the record the item was loaded at is no
    /// longer current. Saving an item without staged changes is a no-op.
    fn save(&self, item: &mut LifecycleItem<P>) -> LifecycleResult<()>;

    /// Version metadata of every record of an item, oldest first.
    fn get_all_versions(&self, uid: &str) -> LifecycleResult<Vec<VersionMetadata>>;

    /// Every record of an item, oldest first.
    fn history(&self, uid: &str) -> LifecycleResult<Vec<HistoryRecord<P>>>;

    /// True if a live item in `library` is currently named `name`.
    fn check_exists_by_name(&self, library: &str, name: &str) -> LifecycleResult<bool>;

    /// Live items matching `filter`, as of their latest record.
    fn find_all(&self, filter: &ItemFilter) -> LifecycleResult<Vec<LifecycleItem<P>>>;

    /// Records of all items, newest first.
    fn audit_trail(&self, page: Page) -> LifecycleResult<Vec<HistoryRecord<P>>>;

    /// True if the item was ever approved.
    fn check_exists_final_version(&self, uid: &str) -> LifecycleResult<bool>;

    /// Releases connection / file resources held by this repository.
    fn close(&self) -> LifecycleResult<()>;

    /// Registers a request-scoped session.
    fn begin_session(&self) {}

    /// Ends a session opened with `begin_session`.
    ///
    /// Repositories shared between concurrent sessions release resources
    /// only when the last one ends.
    fn end_session(&self) -> LifecycleResult<()> {
        self.close()
    }
}

/// Uniqueness checker scoped to one library of a repository.
pub struct LibraryNames<'a, R: ?Sized, P> {
    repository: &'a R,
    library: &'a str,
    _payload: PhantomData<fn() -> P>,
}

impl<'a, R: ?Sized, P> LibraryNames<'a, R, P> {
    pub fn new(repository: &'a R, library: &'a str) -> Self {
        Self {
            repository,
            library,
            _payload: PhantomData,
        }
    }
}

impl<R, P> NameUniquenessChecker for LibraryNames<'_, R, P>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
{
    fn name_exists(&self, candidate: &str) -> LifecycleResult<bool> {
        self.repository.check_exists_by_name(self.library, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_for_update_rejects_selectors() {
        assert!(FindQuery::for_update().validate().is_ok());
        let err = FindQuery::for_update()
            .with_status(ItemStatus::Final)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidInput(_)));
        assert!(FindQuery::latest()
            .with_version(VersionNumber::new(1, 0))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_matches() {
        let metadata = VersionMetadata::initial("alice");
        assert!(FindQuery::latest().matches(&metadata));
        assert!(FindQuery::latest()
            .with_version(VersionNumber::INITIAL)
            .with_status(ItemStatus::Draft)
            .matches(&metadata));
        assert!(!FindQuery::latest()
            .with_status(ItemStatus::Final)
            .matches(&metadata));
        assert!(!FindQuery::latest()
            .at(metadata.start_date() - Duration::seconds(1))
            .matches(&metadata));
        assert!(FindQuery::latest()
            .at(metadata.start_date())
            .matches(&metadata));
    }

    #[test]
    fn test_display() {
        assert_eq!(FindQuery::latest().to_string(), "latest");
        let q = FindQuery::latest()
            .with_version(VersionNumber::new(2, 0))
            .with_status(ItemStatus::Retired);
        assert_eq!(q.to_string(), "version=2.0, status=Retired");
    }

    #[test]
    fn test_page_slice() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(Page::all().slice(items.clone()), items);
        assert_eq!(Page::new(1, 3).slice(items.clone()), vec![1, 2, 3]);
        assert_eq!(Page::new(3, 3).slice(items.clone()), vec![7]);
        assert!(Page::new(4, 3).slice(items).is_empty());
    }
}
