//! Request-scoped repository sessions
//!
//! A `Session` borrows a repository for the duration of one request. It
//! registers itself on open and ends itself when dropped, on success and
//! error paths alike; the repository decides what to release then.

use std::marker::PhantomData;
use std::ops::Deref;

use uuid::Uuid;

use super::contract::Repository;
use crate::errors::LifecycleResult;
use crate::lifecycle::ItemPayload;
use crate::observability::{log_event_with_fields, Event, Logger};

/// RAII guard releasing repository resources on drop.
pub struct Session<'a, R, P>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
{
    id: Uuid,
    repository: &'a R,
    _payload: PhantomData<fn() -> P>,
}

impl<'a, R, P> Session<'a, R, P>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
{
    pub fn open(repository: &'a R) -> Self {
        let id = Uuid::new_v4();
        let session = id.to_string();
        repository.begin_session();
        log_event_with_fields(Event::SessionOpened, &[("session", session.as_str())]);
        Self {
            id,
            repository,
            _payload: PhantomData,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<R, P> Deref for Session<'_, R, P>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
{
    type Target = R;

    fn deref(&self) -> &R {
        self.repository
    }
}

impl<R, P> Drop for Session<'_, R, P>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
{
    fn drop(&mut self) {
        let id = self.id.to_string();
        match self.repository.end_session() {
            Ok(()) => log_event_with_fields(Event::SessionClosed, &[("session", id.as_str())]),
            Err(e) => {
                let error = e.to_string();
                Logger::error(
                    "SESSION_CLOSE_FAILED",
                    &[("session", id.as_str()), ("error", error.as_str())],
                );
            }
        }
    }
}

/// Runs `f` inside a session on `repository`.
pub fn with_session<R, P, T, F>(repository: &R, f: F) -> LifecycleResult<T>
where
    R: Repository<P> + ?Sized,
    P: ItemPayload,
    F: FnOnce(&R) -> LifecycleResult<T>,
{
    let session = Session::<R, P>::open(repository);
    f(&*session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LifecycleError;
    use crate::library::{Library, LibraryRegistry};
    use crate::repository::{FindQuery, MemoryRepository};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Term(String);

    impl ItemPayload for Term {
        fn name(&self) -> &str {
            &self.0
        }
    }

    fn repository() -> MemoryRepository<Term> {
        let registry = LibraryRegistry::with_libraries([Library::new("Sponsor", true)]).unwrap();
        MemoryRepository::new(Arc::new(registry))
    }

    #[test]
    fn test_session_closes_on_success() {
        let repo = repository();
        let count = with_session::<_, Term, _, _>(&repo, |r| {
            let len = r.len();
            assert!(r.is_connected());
            Ok(len)
        })
        .unwrap();
        assert_eq!(count, 0);
        assert!(!repo.is_connected());
    }

    #[test]
    fn test_session_closes_on_error() {
        let repo = repository();
        let err = with_session::<_, Term, _, _>(&repo, |r| {
            r.find_by_uid("Item_000042", &FindQuery::latest())
        })
        .unwrap_err();
        assert!(matches!(err, LifecycleError::ItemNotFound { .. }));
        assert!(!repo.is_connected());
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let repo = repository();
        let a = Session::<_, Term>::open(&repo);
        let b = Session::<_, Term>::open(&repo);
        assert_ne!(a.id(), b.id());
    }
}
