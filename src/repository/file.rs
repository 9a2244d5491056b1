//! Journal-backed repository
//!
//! State lives in a `HistoryStore`, rebuilt at open by replaying the journal
//! from sequence 1. A save is validated, journaled (and fsynced), and only
//! then applied in memory; a failed append leaves memory untouched.
//!
//! Several instances (one per CLI process, say) may share a data directory.
//! A save takes the exclusive journal lock, first applies any frames other
//! instances appended since this one last read the file, and only then
//! validates and appends. A writer holding a stale revision therefore gets
//! `StaleRevision`, and sequence numbers stay contiguous.
//!
//! The append handle is opened lazily on the first save and released when
//! the last open session ends, so an idle repository holds no file handle.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::contract::{FindQuery, ItemFilter, Page, Repository};
use super::journal::{
    journal_path, JournalEntry, JournalLock, JournalReader, JournalSync, JournalWriter,
};
use super::memory::DEFAULT_UID_PREFIX;
use super::store::HistoryStore;
use super::HistoryRecord;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::library::LibraryGate;
use crate::lifecycle::{ItemPayload, JsonCodec, LifecycleItem, PayloadCodec, UidGenerator};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::version::VersionMetadata;

/// Options of [`FileRepository::open`].
#[derive(Debug, Clone)]
pub struct FileRepositoryOptions {
    pub uid_prefix: String,
    pub sync: JournalSync,
}

impl Default for FileRepositoryOptions {
    fn default() -> Self {
        Self {
            uid_prefix: DEFAULT_UID_PREFIX.to_string(),
            sync: JournalSync::Fsync,
        }
    }
}

struct FileState<P> {
    store: HistoryStore<P>,
    writer: Option<JournalWriter>,
    next_sequence: u64,
    /// Bytes of the journal already applied to `store`
    journal_len: u64,
    sessions: usize,
}

/// Durable repository persisting every save to an append-only journal.
pub struct FileRepository<P, C = JsonCodec<P>> {
    journal_path: PathBuf,
    options: FileRepositoryOptions,
    state: RwLock<FileState<P>>,
    libraries: Arc<dyn LibraryGate>,
    codec: C,
    metrics: Option<Arc<MetricsRegistry>>,
    _payload: PhantomData<fn() -> P>,
}

impl<P, C> FileRepository<P, C>
where
    P: ItemPayload,
    C: PayloadCodec<P>,
{
    /// Opens the repository under `data_dir`, replaying its journal.
    ///
    /// # Errors
    ///
    /// `Corruption` if any frame is damaged or does not continue the history
    /// rebuilt so far. The repository refuses to open rather than serve a
    /// partial state.
    pub fn open(
        data_dir: &Path,
        libraries: Arc<dyn LibraryGate>,
        codec: C,
        options: FileRepositoryOptions,
    ) -> LifecycleResult<Self> {
        let journal_path = journal_path(data_dir);
        let (store, last_sequence, journal_len) = Self::replay(&journal_path, &codec)?;

        Ok(Self {
            journal_path,
            options,
            state: RwLock::new(FileState {
                store,
                writer: None,
                next_sequence: last_sequence + 1,
                journal_len,
                sessions: 0,
            }),
            libraries,
            codec,
            metrics: None,
            _payload: PhantomData,
        })
    }

    /// Counts journal appends in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// True while an append handle is held.
    pub fn has_open_handle(&self) -> bool {
        self.read().writer.is_some()
    }

    /// Sequence number the next save will be journaled under.
    pub fn next_sequence_number(&self) -> u64 {
        self.read().next_sequence
    }

    fn replay(path: &Path, codec: &C) -> LifecycleResult<(HistoryStore<P>, u64, u64)> {
        let mut store = HistoryStore::new();
        if !path.exists() {
            return Ok((store, 0, 0));
        }

        let path_str = path.display().to_string();
        let scope = ObservationScope::with_fields("JOURNAL_REPLAY", &[("path", path_str.as_str())]);
        let mut reader = JournalReader::open(path)?;

        loop {
            let offset = reader.current_offset();
            let frame = match reader.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(Self::replay_failed(scope, e)),
            };
            if let Err(e) = Self::replay_frame(&mut store, &frame.body, codec) {
                let err = Self::bad_frame(offset, frame.sequence, e);
                return Err(Self::replay_failed(scope, err));
            }
        }

        let frames = reader.last_sequence_number();
        let frame_count = frames.to_string();
        let item_count = store.len().to_string();
        scope.complete_with_fields(&[
            ("frames", frame_count.as_str()),
            ("items", item_count.as_str()),
        ]);
        Ok((store, frames, reader.current_offset()))
    }

    /// Applies frames appended by other instances since the last read.
    ///
    /// Must run under the journal lock.
    fn catch_up(&self, state: &mut FileState<P>) -> LifecycleResult<()> {
        let len = fs::metadata(&self.journal_path)?.len();
        if len == state.journal_len {
            return Ok(());
        }

        let mut reader =
            JournalReader::resume(&self.journal_path, state.journal_len, state.next_sequence - 1)
                .map_err(Self::log_corruption)?;
        let mut frames = 0u64;
        loop {
            let offset = reader.current_offset();
            let frame = match reader.read_next() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => return Err(Self::log_corruption(e)),
            };
            Self::replay_frame(&mut state.store, &frame.body, &self.codec)
                .map_err(|e| Self::log_corruption(Self::bad_frame(offset, frame.sequence, e)))?;
            state.next_sequence = frame.sequence + 1;
            state.journal_len = reader.current_offset();
            frames += 1;
        }

        let frame_count = frames.to_string();
        let next_sequence = state.next_sequence.to_string();
        log_event_with_fields(
            Event::JournalCaughtUp,
            &[
                ("frames", frame_count.as_str()),
                ("next_sequence", next_sequence.as_str()),
            ],
        );
        Ok(())
    }

    fn replay_frame(store: &mut HistoryStore<P>, body: &[u8], codec: &C) -> LifecycleResult<()> {
        let entry = JournalEntry::from_bytes(body)?;
        let found = store.current_revision(&entry.uid);
        if found != entry.base_revision {
            return Err(LifecycleError::StaleRevision {
                uid: entry.uid.clone(),
                expected: entry.base_revision.unwrap_or(0),
                found,
            });
        }
        let changes = entry.to_changes(codec)?;
        store.apply_changes(&entry.uid, &entry.library, &changes)
    }

    fn bad_frame(offset: u64, sequence: u64, err: LifecycleError) -> LifecycleError {
        LifecycleError::Corruption {
            offset,
            reason: format!("frame {}: {}", sequence, err),
        }
    }

    fn log_corruption(err: LifecycleError) -> LifecycleError {
        let reason = err.to_string();
        log_event_with_fields(Event::JournalCorruption, &[("error", reason.as_str())]);
        err
    }

    fn replay_failed(scope: ObservationScope<'_>, err: LifecycleError) -> LifecycleError {
        let err = Self::log_corruption(err);
        scope.fail(&err.to_string());
        err
    }

    fn release(state: &mut FileState<P>) -> LifecycleResult<()> {
        if let Some(writer) = state.writer.take() {
            writer.fsync()?;
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, FileState<P>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, FileState<P>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<P, C> UidGenerator for FileRepository<P, C>
where
    P: ItemPayload,
    C: PayloadCodec<P>,
{
    fn generate_uid(&self) -> String {
        self.write().store.next_uid(&self.options.uid_prefix)
    }
}

impl<P, C> Repository<P> for FileRepository<P, C>
where
    P: ItemPayload,
    C: PayloadCodec<P>,
{
    fn find_by_uid(&self, uid: &str, query: &FindQuery) -> LifecycleResult<LifecycleItem<P>> {
        self.read().store.load(self.libraries.as_ref(), uid, query)
    }

    fn save(&self, item: &mut LifecycleItem<P>) -> LifecycleResult<()> {
        if !item.has_pending_changes() {
            return Ok(());
        }

        let mut guard = self.write();
        let state = &mut *guard;
        let _lock = JournalLock::acquire(&self.journal_path)?;
        self.catch_up(state)?;
        state.store.validate_save(item)?;

        let entry = JournalEntry::from_changes(
            item.uid(),
            item.library().name(),
            item.loaded_revision(),
            item.pending_changes(),
            &self.codec,
        )?;
        let body = entry.to_bytes()?;

        // A catch-up moves the sequence past what an open writer expects
        let current = state
            .writer
            .as_ref()
            .map_or(false, |w| w.next_sequence_number() == state.next_sequence);
        if !current {
            state.writer = Some(JournalWriter::open(
                &self.journal_path,
                state.next_sequence,
                self.options.sync,
            )?);
        }
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LifecycleError::Storage("journal writer unavailable".to_string()))?;
        let (sequence, bytes) = match writer.append(body) {
            Ok(appended) => appended,
            Err(e) => {
                state.writer = None;
                return Err(e);
            }
        };
        state.next_sequence = sequence + 1;
        state.journal_len += bytes;
        if let Some(metrics) = &self.metrics {
            metrics.add_journal_record(bytes);
        }

        state
            .store
            .apply_changes(item.uid(), item.library().name(), item.pending_changes())?;
        item.mark_persisted();
        Ok(())
    }

    fn get_all_versions(&self, uid: &str) -> LifecycleResult<Vec<VersionMetadata>> {
        self.read().store.versions(uid)
    }

    fn history(&self, uid: &str) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        self.read().store.history(uid)
    }

    fn check_exists_by_name(&self, library: &str, name: &str) -> LifecycleResult<bool> {
        Ok(self.read().store.name_exists(library, name))
    }

    fn find_all(&self, filter: &ItemFilter) -> LifecycleResult<Vec<LifecycleItem<P>>> {
        self.read().store.find_all(self.libraries.as_ref(), filter)
    }

    fn audit_trail(&self, page: Page) -> LifecycleResult<Vec<HistoryRecord<P>>> {
        Ok(self.read().store.audit_trail(page))
    }

    fn check_exists_final_version(&self, uid: &str) -> LifecycleResult<bool> {
        Ok(self.read().store.exists_final_version(uid))
    }

    fn begin_session(&self) {
        self.write().sessions += 1;
    }

    /// Releases the append handle once no other session is open.
    fn end_session(&self) -> LifecycleResult<()> {
        let mut state = self.write();
        state.sessions = state.sessions.saturating_sub(1);
        if state.sessions > 0 {
            return Ok(());
        }
        Self::release(&mut state)
    }

    /// Flushes and releases the append handle.
    fn close(&self) -> LifecycleResult<()> {
        Self::release(&mut self.write())
    }
}
