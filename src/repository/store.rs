//! HistoryStore - append-only item histories
//!
//! Shared state of the repository implementations. Each item owns its
//! records in revision order; only the last record is open (no end date).
//! The store knows nothing about locking or durability: `MemoryRepository`
//! wraps it in a lock, `FileRepository` additionally journals every change
//! before it reaches `apply_changes`.

use std::collections::BTreeMap;

use super::contract::{FindQuery, ItemFilter, Page};
use super::HistoryRecord;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::library::LibraryGate;
use crate::lifecycle::{ItemPayload, LifecycleItem, StagedChange};
use crate::version::{ItemStatus, VersionMetadata};

const DELETED_MESSAGE: &str = "Cannot use deleted object";

#[derive(Debug, Clone)]
struct StoredItem<P> {
    library: String,
    records: Vec<HistoryRecord<P>>,
    is_deleted: bool,
}

impl<P> StoredItem<P> {
    fn current_revision(&self) -> u64 {
        self.records.last().map_or(0, |r| r.revision())
    }

    fn latest(&self) -> Option<&HistoryRecord<P>> {
        self.records.last()
    }
}

/// In-memory item histories keyed by uid.
#[derive(Debug)]
pub(crate) struct HistoryStore<P> {
    items: BTreeMap<String, StoredItem<P>>,
    uid_counter: u64,
}

impl<P: ItemPayload> HistoryStore<P> {
    pub(crate) fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            uid_counter: 0,
        }
    }

    /// Number of items with at least one record.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Revision of the latest record of `uid`.
    pub(crate) fn current_revision(&self, uid: &str) -> Option<u64> {
        self.items.get(uid).map(StoredItem::current_revision)
    }

    // ==================
    // Writes
    // ==================

    /// Checks that the changes staged on `item` may be applied.
    ///
    /// # Errors
    ///
    /// - `ReadOnlyItem` if the item was not retrieved for update
    /// - `UidExists` if a new item collides with a stored uid
    /// - `StaleRevision` if the stored history moved on since the load
    /// - `BusinessRule` if the stored item was deleted in the meantime
    /// - `NameExists` if another live item took the name since the load
    pub(crate) fn validate_save(&self, item: &LifecycleItem<P>) -> LifecycleResult<()> {
        if !item.is_for_update() {
            return Err(LifecycleError::ReadOnlyItem(item.uid().to_string()));
        }

        match item.loaded_revision() {
            None => {
                if self.items.contains_key(item.uid()) {
                    return Err(LifecycleError::UidExists(item.uid().to_string()));
                }
            }
            Some(expected) => {
                let stored = self.items.get(item.uid());
                let found = stored.map(StoredItem::current_revision);
                if found != Some(expected) {
                    return Err(LifecycleError::StaleRevision {
                        uid: item.uid().to_string(),
                        expected,
                        found,
                    });
                }
                if stored.map_or(false, |s| s.is_deleted) {
                    return Err(LifecycleError::business(item.uid(), DELETED_MESSAGE));
                }
            }
        }

        let renamed = item.pending_changes().iter().rev().find_map(|c| match c {
            StagedChange::Record(record) => Some(record.payload().name()),
            _ => None,
        });
        if let Some(name) = renamed {
            let unchanged = self
                .items
                .get(item.uid())
                .and_then(StoredItem::latest)
                .map_or(false, |r| r.payload().name() == name);
            if !unchanged && self.name_taken_by_other(item.library().name(), name, item.uid()) {
                return Err(LifecycleError::NameExists {
                    library: item.library().name().to_string(),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Applies staged changes in order.
    ///
    /// Record revisions must continue the stored history without gaps; a
    /// gap means the change stream was not produced against this state.
    pub(crate) fn apply_changes(
        &mut self,
        uid: &str,
        library: &str,
        changes: &[StagedChange<P>],
    ) -> LifecycleResult<()> {
        for change in changes {
            match change {
                StagedChange::Record(record) => self.append_record(library, record.clone())?,
                StagedChange::SoftDelete => {
                    let stored = self
                        .items
                        .get_mut(uid)
                        .ok_or_else(|| LifecycleError::not_found(uid, "soft delete"))?;
                    stored.is_deleted = true;
                }
                StagedChange::Erase => {
                    self.items.remove(uid);
                }
            }
        }
        Ok(())
    }

    fn append_record(&mut self, library: &str, record: HistoryRecord<P>) -> LifecycleResult<()> {
        let uid = record.uid().to_string();
        self.observe_uid(&uid);

        let stored = self.items.entry(uid.clone()).or_insert_with(|| StoredItem {
            library: library.to_string(),
            records: Vec::new(),
            is_deleted: false,
        });

        let expected = stored.current_revision() + 1;
        if record.revision() != expected {
            return Err(LifecycleError::Storage(format!(
                "revision gap for {}: expected {}, got {}",
                uid,
                expected,
                record.revision()
            )));
        }

        if let Some(previous) = stored.records.pop() {
            let start = record.metadata().start_date();
            stored.records.push(previous.closed_at(start));
        }
        stored.records.push(record);
        Ok(())
    }

    // ==================
    // Uids
    // ==================

    /// Next free uid of the form `{prefix}_{counter:06}`.
    pub(crate) fn next_uid(&mut self, prefix: &str) -> String {
        loop {
            self.uid_counter += 1;
            let candidate = format!("{}_{:06}", prefix, self.uid_counter);
            if !self.items.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Keeps the counter ahead of uids written by earlier runs.
    fn observe_uid(&mut self, uid: &str) {
        let counter = uid
            .rsplit_once('_')
            .and_then(|(_, digits)| digits.parse::<u64>().ok());
        if let Some(counter) = counter {
            self.uid_counter = self.uid_counter.max(counter);
        }
    }

    // ==================
    // Reads
    // ==================

    pub(crate) fn load<G>(
        &self,
        gate: &G,
        uid: &str,
        query: &FindQuery,
    ) -> LifecycleResult<LifecycleItem<P>>
    where
        G: LibraryGate + ?Sized,
    {
        query.validate()?;
        let stored = self
            .items
            .get(uid)
            .ok_or_else(|| LifecycleError::not_found(uid, query.to_string()))?;
        let record = stored
            .records
            .iter()
            .rev()
            .find(|r| query.matches(r.metadata()))
            .ok_or_else(|| LifecycleError::not_found(uid, query.to_string()))?;
        let library = gate.find_by_name(&stored.library)?;

        Ok(LifecycleItem::from_repository_values(
            library,
            record.clone(),
            stored.current_revision(),
            stored.is_deleted,
            query.for_update,
        ))
    }

    pub(crate) fn versions(&self, uid: &str) -> LifecycleResult<Vec<VersionMetadata>> {
        Ok(self
            .records(uid)?
            .iter()
            .map(|r| r.metadata().clone())
            .collect())
    }

    pub(crate) fn history(&self, uid: &str) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        Ok(self.records(uid)?.to_vec())
    }

    fn records(&self, uid: &str) -> LifecycleResult<&[HistoryRecord<P>]> {
        self.items
            .get(uid)
            .map(|s| s.records.as_slice())
            .ok_or_else(|| LifecycleError::not_found(uid, "history"))
    }

    /// True if a live item in `library` currently carries `name`.
    pub(crate) fn name_exists(&self, library: &str, name: &str) -> bool {
        self.live_in(library)
            .any(|(_, r)| r.payload().name() == name)
    }

    fn name_taken_by_other(&self, library: &str, name: &str, uid: &str) -> bool {
        self.live_in(library)
            .any(|(other, r)| other != uid && r.payload().name() == name)
    }

    fn live_in<'a>(
        &'a self,
        library: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a HistoryRecord<P>)> + 'a {
        self.items
            .iter()
            .filter(move |(_, s)| !s.is_deleted && s.library == library)
            .filter_map(|(uid, s)| s.latest().map(|r| (uid.as_str(), r)))
    }

    pub(crate) fn find_all<G>(
        &self,
        gate: &G,
        filter: &ItemFilter,
    ) -> LifecycleResult<Vec<LifecycleItem<P>>>
    where
        G: LibraryGate + ?Sized,
    {
        let mut items = Vec::new();
        for stored in self.items.values() {
            if stored.is_deleted {
                continue;
            }
            if filter.library.as_deref().map_or(false, |l| l != stored.library) {
                continue;
            }
            let Some(latest) = stored.latest() else {
                continue;
            };
            if filter.status.map_or(false, |s| s != latest.metadata().status()) {
                continue;
            }
            let library = gate.find_by_name(&stored.library)?;
            items.push(LifecycleItem::from_repository_values(
                library,
                latest.clone(),
                stored.current_revision(),
                false,
                false,
            ));
        }
        Ok(items)
    }

    /// Records of every item, newest first.
    pub(crate) fn audit_trail(&self, page: Page) -> Vec<HistoryRecord<P>> {
        let mut records: Vec<HistoryRecord<P>> = self
            .items
            .values()
            .flat_map(|s| s.records.iter().cloned())
            .collect();
        records.sort_by(|a, b| {
            b.metadata()
                .start_date()
                .cmp(&a.metadata().start_date())
                .then_with(|| b.uid().cmp(a.uid()))
                .then_with(|| b.revision().cmp(&a.revision()))
        });
        page.slice(records)
    }

    /// True if any record of `uid` was Final.
    pub(crate) fn exists_final_version(&self, uid: &str) -> bool {
        self.items.get(uid).map_or(false, |s| {
            s.records
                .iter()
                .any(|r| r.metadata().status() == ItemStatus::Final)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::library::{Library, LibraryRegistry};
    use crate::lifecycle::UidGenerator;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Term(String);

    impl ItemPayload for Term {
        fn name(&self) -> &str {
            &self.0
        }
    }

    struct Uids<'a>(&'a RefCell<HistoryStore<Term>>);

    impl UidGenerator for Uids<'_> {
        fn generate_uid(&self) -> String {
            self.0.borrow_mut().next_uid("Term")
        }
    }

    fn registry() -> LibraryRegistry {
        LibraryRegistry::with_libraries([Library::new("Sponsor", true)]).unwrap()
    }

    fn create(store: &RefCell<HistoryStore<Term>>, name: &str) -> LifecycleItem<Term> {
        let uids = Uids(store);
        let mut item = LifecycleItem::create(
            Library::new("Sponsor", true),
            Term(name.into()),
            "alice",
            &uids,
            &|n: &str| store.borrow().name_exists("Sponsor", n),
        )
        .unwrap();
        save(store, &mut item).unwrap();
        item
    }

    fn save(store: &RefCell<HistoryStore<Term>>, item: &mut LifecycleItem<Term>) -> LifecycleResult<()> {
        let mut store = store.borrow_mut();
        store.validate_save(item)?;
        store.apply_changes(item.uid(), item.library().name(), item.pending_changes())?;
        item.mark_persisted();
        Ok(())
    }

    #[test]
    fn test_uids_are_prefixed_and_padded() {
        let mut store = HistoryStore::<Term>::new();
        assert_eq!(store.next_uid("Term"), "Term_000001");
        assert_eq!(store.next_uid("Term"), "Term_000002");
    }

    #[test]
    fn test_superseded_record_is_closed() {
        let store = RefCell::new(HistoryStore::new());
        let mut item = create(&store, "Weight");
        item.approve("alice", None).unwrap();
        save(&store, &mut item).unwrap();

        let versions = store.borrow().versions(item.uid()).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].end_date(), Some(versions[1].start_date()));
        assert!(versions[1].is_current());
    }

    #[test]
    fn test_load_with_selectors() {
        let store = RefCell::new(HistoryStore::new());
        let mut item = create(&store, "Weight");
        item.approve("alice", None).unwrap();
        item.new_version("alice", None).unwrap();
        save(&store, &mut item).unwrap();

        let gate = registry();
        let store = store.borrow();
        let final_item = store
            .load(&gate, item.uid(), &FindQuery::latest().with_status(ItemStatus::Final))
            .unwrap();
        assert_eq!(final_item.metadata().version().to_string(), "1.0");
        assert!(!final_item.is_current());

        let err = store
            .load(&gate, item.uid(), &FindQuery::latest().with_status(ItemStatus::Retired))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_stale_save_is_rejected() {
        let store = RefCell::new(HistoryStore::new());
        let created = create(&store, "Weight");
        let gate = registry();

        let mut first = store.borrow().load(&gate, created.uid(), &FindQuery::for_update()).unwrap();
        let mut second = first.clone();
        first.approve("alice", None).unwrap();
        save(&store, &mut first).unwrap();

        second.edit("bob", Term("Height".into()), "late", &|_: &str| false).unwrap();
        let err = save(&store, &mut second).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::StaleRevision { expected: 1, found: Some(2), .. }
        ));
        assert_eq!(store.borrow().current_revision(created.uid()), Some(2));
    }

    #[test]
    fn test_erase_removes_history() {
        let store = RefCell::new(HistoryStore::new());
        let mut item = create(&store, "Weight");
        item.delete().unwrap();
        save(&store, &mut item).unwrap();
        assert_eq!(store.borrow().len(), 0);
        assert!(!store.borrow().name_exists("Sponsor", "Weight"));
    }

    #[test]
    fn test_soft_deleted_item_frees_its_name() {
        let store = RefCell::new(HistoryStore::new());
        let mut item = create(&store, "Weight");
        item.approve("alice", None).unwrap();
        item.inactivate("alice", None).unwrap();
        item.delete().unwrap();
        save(&store, &mut item).unwrap();

        let store = store.borrow();
        assert!(!store.name_exists("Sponsor", "Weight"));
        assert_eq!(store.versions(item.uid()).unwrap().len(), 3);
        assert!(store.exists_final_version(item.uid()));
    }

    #[test]
    fn test_revision_gap_is_storage_error() {
        let store = RefCell::new(HistoryStore::new());
        let mut item = create(&store, "Weight");
        item.approve("alice", None).unwrap();
        let mut changes = item.pending_changes().to_vec();
        changes.extend(item.pending_changes().iter().cloned());

        let err = store
            .borrow_mut()
            .apply_changes(item.uid(), "Sponsor", &changes)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_audit_trail_is_newest_first() {
        let store = RefCell::new(HistoryStore::new());
        let mut weight = create(&store, "Weight");
        create(&store, "Height");
        weight.approve("alice", None).unwrap();
        save(&store, &mut weight).unwrap();

        let trail = store.borrow().audit_trail(Page::all());
        assert_eq!(trail.len(), 3);
        assert!(trail
            .windows(2)
            .all(|w| w[0].metadata().start_date() >= w[1].metadata().start_date()));
        let weight_first = trail.iter().position(|r| r.uid() == weight.uid()).unwrap();
        assert_eq!(trail[weight_first].revision(), 2);
        assert_eq!(store.borrow().audit_trail(Page::new(2, 2)).len(), 1);
    }
}
