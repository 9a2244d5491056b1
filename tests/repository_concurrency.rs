//! Optimistic concurrency of repository saves
//!
//! Two writers load the same item for update; the first save wins and the
//! second is refused with a retryable conflict. Nothing is lost or merged.

use std::sync::Arc;
use std::thread;

use mdr_lifecycle::errors::{ErrorKind, LifecycleError};
use mdr_lifecycle::library::{Library, LibraryGate, LibraryRegistry};
use mdr_lifecycle::lifecycle::LifecycleItem;
use mdr_lifecycle::repository::{FindQuery, LibraryNames, MemoryRepository, Repository};
use mdr_lifecycle::{GenericPayload, LifecycleEngine};
use serde_json::json;

type Repo = MemoryRepository<GenericPayload>;

// =============================================================================
// Test Utilities
// =============================================================================

fn repository() -> Repo {
    let gate: Arc<dyn LibraryGate> =
        Arc::new(LibraryRegistry::with_libraries([Library::new("Sponsor", true)]).unwrap());
    MemoryRepository::new(gate)
}

fn create(repo: &Repo, name: &str) -> String {
    let names = LibraryNames::<_, GenericPayload>::new(repo, "Sponsor");
    let mut item = LifecycleItem::create(
        Library::new("Sponsor", true),
        GenericPayload::new(name),
        "alice",
        repo,
        &names,
    )
    .unwrap();
    repo.save(&mut item).unwrap();
    item.uid().to_string()
}

fn load(repo: &Repo, uid: &str) -> LifecycleItem<GenericPayload> {
    repo.find_by_uid(uid, &FindQuery::for_update()).unwrap()
}

fn payload(n: i64) -> GenericPayload {
    GenericPayload::new("Weight").with_attribute("n", json!(n))
}

// =============================================================================
// Two writers
// =============================================================================

#[test]
fn test_second_writer_gets_conflict() {
    let repo = repository();
    let uid = create(&repo, "Weight");

    let mut first = load(&repo, &uid);
    let mut second = load(&repo, &uid);
    let names = LibraryNames::<_, GenericPayload>::new(&repo, "Sponsor");

    first.approve("alice", None).unwrap();
    repo.save(&mut first).unwrap();

    second.edit("bob", payload(2), "late edit", &names).unwrap();
    let err = repo.save(&mut second).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        LifecycleError::StaleRevision {
            expected: 1,
            found: Some(2),
            ..
        }
    ));

    // The winner's record is intact, the loser's edit left no trace
    let versions = repo.get_all_versions(&uid).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[1].version().to_string(), "1.0");

    // A reload sees the new state and the policy applies to it
    let mut retry = load(&repo, &uid);
    let err = retry.edit("bob", payload(2), "late edit", &names).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    retry.new_version("bob", None).unwrap();
    repo.save(&mut retry).unwrap();
    assert_eq!(repo.get_all_versions(&uid).unwrap().len(), 3);
}

#[test]
fn test_concurrent_creates_with_same_name() {
    let repo = repository();
    let names = LibraryNames::<_, GenericPayload>::new(&repo, "Sponsor");
    let library = Library::new("Sponsor", true);

    // Both pass the name check before either is saved
    let mut a = LifecycleItem::create(
        library.clone(),
        GenericPayload::new("Weight"),
        "alice",
        &repo,
        &names,
    )
    .unwrap();
    let mut b =
        LifecycleItem::create(library, GenericPayload::new("Weight"), "bob", &repo, &names).unwrap();

    repo.save(&mut a).unwrap();
    let err = repo.save(&mut b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(repo.len(), 1);
}

#[test]
fn test_save_without_changes_is_noop() {
    let repo = repository();
    let uid = create(&repo, "Weight");

    let mut item = load(&repo, &uid);
    repo.save(&mut item).unwrap();
    assert_eq!(repo.get_all_versions(&uid).unwrap().len(), 1);

    // Even a stale, unchanged aggregate saves cleanly
    let mut fresh = load(&repo, &uid);
    fresh.approve("alice", None).unwrap();
    repo.save(&mut fresh).unwrap();
    repo.save(&mut item).unwrap();
}

#[test]
fn test_read_only_items_cannot_be_saved() {
    let repo = repository();
    let uid = create(&repo, "Weight");

    let mut item = repo.find_by_uid(&uid, &FindQuery::latest()).unwrap();
    item.approve("alice", None).unwrap();
    let err = repo.save(&mut item).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, LifecycleError::ReadOnlyItem(_)));
    assert_eq!(repo.get_all_versions(&uid).unwrap().len(), 1);
}

#[test]
fn test_revision_advances_once_per_save() {
    let repo = repository();
    let uid = create(&repo, "Weight");

    let mut item = load(&repo, &uid);
    let names = LibraryNames::<_, GenericPayload>::new(&repo, "Sponsor");
    item.edit("alice", payload(1), "one", &names).unwrap();
    item.edit("alice", payload(2), "two", &names).unwrap();
    item.approve("alice", None).unwrap();
    repo.save(&mut item).unwrap();

    let history = repo.history(&uid).unwrap();
    let labels: Vec<String> = history
        .iter()
        .map(|r| r.metadata().version().to_string())
        .collect();
    assert_eq!(labels, vec!["0.1", "0.2", "0.3", "1.0"]);
    assert!(!item.has_pending_changes());
    assert_eq!(item.revision(), 4);
}

// =============================================================================
// Threads
// =============================================================================

#[test]
fn test_parallel_writers_serialize_through_retries() {
    let registry = LibraryRegistry::with_libraries([Library::new("Sponsor", true)]).unwrap();
    let engine: LifecycleEngine<GenericPayload, Repo> =
        LifecycleEngine::in_memory(Arc::new(registry));
    let uid = engine
        .create("Sponsor", payload(0), "alice")
        .unwrap()
        .uid()
        .to_string();

    const WRITERS: i64 = 8;
    const EDITS: i64 = 5;

    thread::scope(|s| {
        for w in 0..WRITERS {
            let engine = &engine;
            let uid = uid.as_str();
            s.spawn(move || {
                for e in 0..EDITS {
                    loop {
                        match engine.edit(uid, "writer", payload(w * 100 + e), "parallel") {
                            Ok(_) => break,
                            Err(err) if err.is_retryable() => continue,
                            Err(err) => panic!("unexpected error: {}", err),
                        }
                    }
                }
            });
        }
    });

    let history = engine.history(&uid).unwrap();
    assert_eq!(history.len() as i64, 1 + WRITERS * EDITS);
    for (i, record) in history.iter().enumerate() {
        assert_eq!(record.revision(), i as u64 + 1);
        assert_eq!(record.metadata().minor(), i as u32 + 1);
    }
    assert!(engine.metrics().snapshot().items_edited == (WRITERS * EDITS) as u64);
}

#[test]
fn test_parallel_creates_get_distinct_uids() {
    let registry = LibraryRegistry::with_libraries([Library::new("Sponsor", true)]).unwrap();
    let engine: LifecycleEngine<GenericPayload, Repo> =
        LifecycleEngine::in_memory(Arc::new(registry));

    let uids: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = &engine;
                s.spawn(move || {
                    engine
                        .create("Sponsor", GenericPayload::new(format!("Item {}", i)), "alice")
                        .unwrap()
                        .uid()
                        .to_string()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut sorted = uids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 16);
    assert_eq!(engine.repository().len(), 16);
}
