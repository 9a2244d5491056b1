//! In-memory repository
//!
//! Holds every history in a `HistoryStore` behind one `RwLock`. Saves take
//! the write lock for validation and apply together, so two writers racing
//! on the same item serialize and the second one sees the first's revision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::contract::{FindQuery, ItemFilter, Page, Repository};
use super::store::HistoryStore;
use super::HistoryRecord;
use crate::errors::LifecycleResult;
use crate::library::LibraryGate;
use crate::lifecycle::{ItemPayload, LifecycleItem, UidGenerator};
use crate::version::VersionMetadata;

/// Default prefix of generated uids.
pub const DEFAULT_UID_PREFIX: &str = "Item";

/// Volatile repository, mainly for tests and embedding.
pub struct MemoryRepository<P> {
    store: RwLock<HistoryStore<P>>,
    libraries: Arc<dyn LibraryGate>,
    uid_prefix: String,
    connected: AtomicBool,
}

impl<P: ItemPayload> MemoryRepository<P> {
    pub fn new(libraries: Arc<dyn LibraryGate>) -> Self {
        Self::with_uid_prefix(libraries, DEFAULT_UID_PREFIX)
    }

    pub fn with_uid_prefix(libraries: Arc<dyn LibraryGate>, uid_prefix: impl Into<String>) -> Self {
        Self {
            store: RwLock::new(HistoryStore::new()),
            libraries,
            uid_prefix: uid_prefix.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// True between first use and the next `close`.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of stored items, deleted ones included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HistoryStore<P>> {
        self.connected.store(true, Ordering::Release);
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HistoryStore<P>> {
        self.connected.store(true, Ordering::Release);
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<P: ItemPayload> UidGenerator for MemoryRepository<P> {
    fn generate_uid(&self) -> String {
        self.write().next_uid(&self.uid_prefix)
    }
}

impl<P: ItemPayload> Repository<P> for MemoryRepository<P> {
    fn find_by_uid(&self, uid: &str, query: &FindQuery) -> LifecycleResult<LifecycleItem<P>> {
        self.read().load(self.libraries.as_ref(), uid, query)
    }

    fn save(&self, item: &mut LifecycleItem<P>) -> LifecycleResult<()> {
        if !item.has_pending_changes() {
            return Ok(());
        }
        let mut store = self.write();
        store.validate_save(item)?;
        store.apply_changes(item.uid(), item.library().name(), item.pending_changes())?;
        item.mark_persisted();
        Ok(())
    }

    fn get_all_versions(&self, uid: &str) -> LifecycleResult<Vec<VersionMetadata>> {
        self.read().versions(uid)
    }

    fn history(&self, uid: &str) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        self.read().history(uid)
    }

    fn check_exists_by_name(&self, library: &str, name: &str) -> LifecycleResult<bool> {
        Ok(self.read().name_exists(library, name))
    }

    fn find_all(&self, filter: &ItemFilter) -> LifecycleResult<Vec<LifecycleItem<P>>> {
        self.read().find_all(self.libraries.as_ref(), filter)
    }

    fn audit_trail(&self, page: Page) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        Ok(self.read().audit_trail(page))
    }

    fn check_exists_final_version(&self, uid: &str) -> LifecycleResult<bool> {
        Ok(self.read().exists_final_version(uid))
    }

    fn close(&self) -> LifecycleResult<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, LifecycleError};
    use crate::library::{Library, LibraryRegistry};
    use crate::repository::LibraryNames;
    use crate::version::ItemStatus;

    #[derive(Debug, Clone, PartialEq)]
    struct Term(String);

    impl ItemPayload for Term {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn repository() -> MemoryRepository<Term> {
        let registry = LibraryRegistry::with_libraries([
            Library::new("Sponsor", true),
            Library::new("CDISC", false),
        ])
        .unwrap();
        MemoryRepository::with_uid_prefix(Arc::new(registry), "Term")
    }

    fn create(repo: &MemoryRepository<Term>, name: &str) -> LifecycleItem<Term> {
        let names = LibraryNames::<_, Term>::new(repo, "Sponsor");
        let mut item = LifecycleItem::create(
            Library::new("Sponsor", true),
            Term(name.into()),
            "alice",
            repo,
            &names,
        )
        .unwrap();
        repo.save(&mut item).unwrap();
        item
    }

    #[test]
    fn test_create_and_reload() {
        let repo = repository();
        let item = create(&repo, "Weight");
        assert_eq!(item.uid(), "Term_000001");

        let loaded = repo.find_by_uid(item.uid(), &FindQuery::latest()).unwrap();
        assert_eq!(loaded.payload(), &Term("Weight".into()));
        assert_eq!(loaded.metadata().status(), ItemStatus::Draft);
        assert!(!loaded.is_for_update());
        assert!(repo.check_exists_by_name("Sponsor", "Weight").unwrap());
        assert!(!repo.check_exists_by_name("CDISC", "Weight").unwrap());
    }

    #[test]
    fn test_read_only_item_cannot_be_saved() {
        let repo = repository();
        let item = create(&repo, "Weight");

        let mut loaded = repo.find_by_uid(item.uid(), &FindQuery::latest()).unwrap();
        repo.save(&mut loaded).unwrap();
        loaded.approve("alice", None).unwrap();
        let err = repo.save(&mut loaded).unwrap_err();
        assert!(matches!(err, LifecycleError::ReadOnlyItem(_)));
    }

    #[test]
    fn test_name_clash_detected_at_save() {
        let repo = repository();
        let names = |_: &str| false;
        let mut first = LifecycleItem::create(
            Library::new("Sponsor", true),
            Term("Weight".into()),
            "alice",
            &repo,
            &names,
        )
        .unwrap();
        let mut second = LifecycleItem::create(
            Library::new("Sponsor", true),
            Term("Weight".into()),
            "bob",
            &repo,
            &names,
        )
        .unwrap();
        repo.save(&mut first).unwrap();
        assert_eq!(repo.save(&mut second).unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_find_all_filters() {
        let repo = repository();
        let mut weight = create(&repo, "Weight");
        create(&repo, "Height");
        weight.approve("alice", None).unwrap();
        repo.save(&mut weight).unwrap();

        let all = repo.find_all(&ItemFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        let finals = repo
            .find_all(&ItemFilter {
                library: Some("Sponsor".into()),
                status: Some(ItemStatus::Final),
            })
            .unwrap();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].uid(), weight.uid());
        assert!(repo.check_exists_final_version(weight.uid()).unwrap());
    }

    #[test]
    fn test_close_disconnects() {
        let repo = repository();
        assert!(!repo.is_connected());
        create(&repo, "Weight");
        assert!(repo.is_connected());
        repo.close().unwrap();
        assert!(!repo.is_connected());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_unknown_uid_is_not_found() {
        let repo = repository();
        let err = repo.find_by_uid("Term_999999", &FindQuery::latest()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(repo.get_all_versions("Term_999999").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
