//! LifecycleEngine - one call per request
//!
//! Every mutating operation opens a `Session`, loads the item for update,
//! runs the transition and saves it. Outcomes are logged as typed events and
//! counted in the metrics registry; failures are returned unchanged.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::{LifecycleError, LifecycleResult};
use crate::library::{Library, LibraryCache, LibraryGate, LibraryRegistry};
use crate::lifecycle::{Action, ItemPayload, LifecycleItem, StagedChange};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::repository::{
    with_session, FindQuery, HistoryRecord, ItemFilter, LibraryNames, MemoryRepository, Page,
    Repository,
};
use crate::version::VersionMetadata;

/// Library lookups shared by the engine and its repository.
pub type SharedLibraries = Arc<LibraryCache<Arc<LibraryRegistry>>>;

/// Wraps a registry in the cache the engine invalidates on admin changes.
pub fn shared_libraries(registry: Arc<LibraryRegistry>) -> SharedLibraries {
    Arc::new(LibraryCache::new(registry))
}

pub struct LifecycleEngine<P, R> {
    repository: R,
    libraries: SharedLibraries,
    metrics: Arc<MetricsRegistry>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: ItemPayload> LifecycleEngine<P, MemoryRepository<P>> {
    /// Engine over a volatile repository.
    pub fn in_memory(registry: Arc<LibraryRegistry>) -> Self {
        let libraries = shared_libraries(registry);
        let repository = MemoryRepository::new(libraries.clone());
        Self::new(repository, libraries, Arc::new(MetricsRegistry::new()))
    }
}

impl<P, R> LifecycleEngine<P, R>
where
    P: ItemPayload,
    R: Repository<P>,
{
    /// `libraries` must be the same gate `repository` resolves libraries
    /// through, otherwise editability changes are not seen by loads.
    pub fn new(repository: R, libraries: SharedLibraries, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            repository,
            libraries,
            metrics,
            _payload: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    // ===== Libraries =====

    pub fn libraries(&self) -> Vec<Library> {
        self.libraries.inner().list()
    }

    pub fn provision_library(&self, name: &str, is_editable: bool) -> LifecycleResult<Library> {
        let library = self.libraries.inner().provision(name, is_editable)?;
        self.libraries.invalidate(library.name());
        let editable = library.is_editable().to_string();
        log_event_with_fields(
            Event::LibraryProvisioned,
            &[("library", library.name()), ("is_editable", editable.as_str())],
        );
        Ok(library)
    }

    /// Locks or unlocks a library. The next load of any item in it sees the
    /// new flag.
    pub fn set_library_editable(&self, name: &str, is_editable: bool) -> LifecycleResult<Library> {
        let library = self.libraries.inner().set_editable(name, is_editable)?;
        self.libraries.invalidate(name);
        let editable = is_editable.to_string();
        log_event_with_fields(
            Event::LibraryEditabilityChanged,
            &[("library", name), ("is_editable", editable.as_str())],
        );
        Ok(library)
    }

    // ===== Transitions =====

    /// Creates an item in Draft `0.1` in `library`.
    pub fn create(&self, library: &str, payload: P, author: &str) -> LifecycleResult<LifecycleItem<P>> {
        let result = self.session(|repo| {
            let library = self.libraries.find_by_name(library)?;
            let names = LibraryNames::<R, P>::new(repo, library.name());
            let mut item = LifecycleItem::create(library.clone(), payload, author, repo, &names)?;
            repo.save(&mut item)?;
            Ok(item)
        });

        match result {
            Ok(item) => {
                self.metrics.increment_created();
                Self::log_persisted(Event::ItemCreated, &item, author);
                Ok(item)
            }
            Err(e) => Err(self.rejected(library, "create", e)),
        }
    }

    pub fn edit(
        &self,
        uid: &str,
        author: &str,
        payload: P,
        change_description: &str,
    ) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::Edit, author, |item, repo| {
            let library = item.library().name().to_string();
            let names = LibraryNames::<R, P>::new(repo, &library);
            item.edit(author, payload, change_description, &names)
        })
    }

    pub fn approve(
        &self,
        uid: &str,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::Approve, author, |item, _| {
            item.approve(author, change_description)
        })
    }

    pub fn new_version(
        &self,
        uid: &str,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::NewVersion, author, |item, _| {
            item.new_version(author, change_description)
        })
    }

    pub fn inactivate(
        &self,
        uid: &str,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::Inactivate, author, |item, _| {
            item.inactivate(author, change_description)
        })
    }

    pub fn reactivate(
        &self,
        uid: &str,
        author: &str,
        change_description: Option<&str>,
    ) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::Reactivate, author, |item, _| {
            item.reactivate(author, change_description)
        })
    }

    /// Erases a never-approved draft or soft-deletes a retired item.
    ///
    /// The returned aggregate reflects the state before removal for an
    /// erase, and carries `is_deleted() == true` for a soft delete.
    pub fn delete(&self, uid: &str, author: &str) -> LifecycleResult<LifecycleItem<P>> {
        self.transition(uid, Action::Delete, author, |item, _| item.delete())
    }

    fn transition<F>(
        &self,
        uid: &str,
        action: Action,
        author: &str,
        apply: F,
    ) -> LifecycleResult<LifecycleItem<P>>
    where
        F: FnOnce(&mut LifecycleItem<P>, &R) -> LifecycleResult<()>,
    {
        let result = self.session(|repo| {
            let mut item = repo.find_by_uid(uid, &FindQuery::for_update())?;
            apply(&mut item, repo)?;
            let erased = matches!(item.pending_changes().last(), Some(StagedChange::Erase));
            repo.save(&mut item)?;
            Ok((item, erased))
        });

        match result {
            Ok((item, erased)) => {
                self.metrics.increment_action(action);
                Self::log_persisted(Event::for_action(action, erased), &item, author);
                Ok(item)
            }
            Err(e) => Err(self.rejected(uid, action.as_str(), e)),
        }
    }

    fn session<T, F>(&self, f: F) -> LifecycleResult<T>
    where
        F: FnOnce(&R) -> LifecycleResult<T>,
    {
        self.metrics.increment_sessions();
        with_session::<R, P, _, _>(&self.repository, f)
    }

    fn log_persisted(event: Event, item: &LifecycleItem<P>, author: &str) {
        let version = item.metadata().version().to_string();
        let revision = item.revision().to_string();
        log_event_with_fields(
            event,
            &[
                ("uid", item.uid()),
                ("library", item.library().name()),
                ("status", item.metadata().status().as_str()),
                ("version", version.as_str()),
                ("revision", revision.as_str()),
                ("author", author),
            ],
        );
    }

    fn rejected(&self, subject: &str, action: &str, err: LifecycleError) -> LifecycleError {
        let kind = err.kind();
        self.metrics.increment_rejected(kind);
        let event = match &err {
            LifecycleError::StaleRevision { .. } => Event::SaveConflict,
            _ => Event::TransitionRejected,
        };
        let error = err.to_string();
        log_event_with_fields(
            event,
            &[
                ("subject", subject),
                ("action", action),
                ("kind", kind.as_str()),
                ("error", error.as_str()),
            ],
        );
        err
    }

    // ===== Queries =====

    /// Loads an item read-only; use the transitions to change it.
    pub fn get(&self, uid: &str, query: &FindQuery) -> LifecycleResult<LifecycleItem<P>> {
        self.session(|repo| repo.find_by_uid(uid, query))
    }

    pub fn possible_actions(&self, uid: &str) -> LifecycleResult<BTreeSet<Action>> {
        Ok(self.get(uid, &FindQuery::latest())?.possible_actions())
    }

    pub fn versions(&self, uid: &str) -> LifecycleResult<Vec<VersionMetadata>> {
        self.session(|repo| repo.get_all_versions(uid))
    }

    pub fn history(&self, uid: &str) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        self.session(|repo| repo.history(uid))
    }

    pub fn list(&self, filter: &ItemFilter) -> LifecycleResult<Vec<LifecycleItem<P>>> {
        self.session(|repo| repo.find_all(filter))
    }

    pub fn audit_trail(&self, page: Page) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        self.session(|repo| repo.audit_trail(page))
    }

    pub fn has_final_version(&self, uid: &str) -> LifecycleResult<bool> {
        self.session(|repo| repo.check_exists_final_version(uid))
    }
}
