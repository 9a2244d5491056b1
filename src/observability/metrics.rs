//! Metrics registry
//!
//! - Counters only, monotonic, reset on process start
//! - Thread-safe via relaxed atomics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::errors::ErrorKind;
use crate::lifecycle::Action;

/// Operational counters of one engine instance
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    items_created: AtomicU64,
    items_edited: AtomicU64,
    items_approved: AtomicU64,
    new_versions: AtomicU64,
    items_inactivated: AtomicU64,
    items_reactivated: AtomicU64,
    items_deleted: AtomicU64,
    /// Rejections by error kind
    rejected_not_found: AtomicU64,
    rejected_conflict: AtomicU64,
    rejected_validation: AtomicU64,
    rejected_business_logic: AtomicU64,
    storage_failures: AtomicU64,
    /// Journal frames appended
    journal_records: AtomicU64,
    journal_bytes: AtomicU64,
    sessions_opened: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_created(&self) {
        self.items_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a persisted transition.
    pub fn increment_action(&self, action: Action) {
        let counter = match action {
            Action::Edit => &self.items_edited,
            Action::Approve => &self.items_approved,
            Action::NewVersion => &self.new_versions,
            Action::Inactivate => &self.items_inactivated,
            Action::Reactivate => &self.items_reactivated,
            Action::Delete => &self.items_deleted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a refused or failed request.
    pub fn increment_rejected(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::NotFound => &self.rejected_not_found,
            ErrorKind::Conflict => &self.rejected_conflict,
            ErrorKind::Validation => &self.rejected_validation,
            ErrorKind::BusinessLogic => &self.rejected_business_logic,
            ErrorKind::Storage => &self.storage_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_journal_record(&self, bytes: u64) {
        self.journal_records.fetch_add(1, Ordering::Relaxed);
        self.journal_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_sessions(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            items_created: load(&self.items_created),
            items_edited: load(&self.items_edited),
            items_approved: load(&self.items_approved),
            new_versions: load(&self.new_versions),
            items_inactivated: load(&self.items_inactivated),
            items_reactivated: load(&self.items_reactivated),
            items_deleted: load(&self.items_deleted),
            rejected_not_found: load(&self.rejected_not_found),
            rejected_conflict: load(&self.rejected_conflict),
            rejected_validation: load(&self.rejected_validation),
            rejected_business_logic: load(&self.rejected_business_logic),
            storage_failures: load(&self.storage_failures),
            journal_records: load(&self.journal_records),
            journal_bytes: load(&self.journal_bytes),
            sessions_opened: load(&self.sessions_opened),
        }
    }

    /// Current snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub items_created: u64,
    pub items_edited: u64,
    pub items_approved: u64,
    pub new_versions: u64,
    pub items_inactivated: u64,
    pub items_reactivated: u64,
    pub items_deleted: u64,
    pub rejected_not_found: u64,
    pub rejected_conflict: u64,
    pub rejected_validation: u64,
    pub rejected_business_logic: u64,
    pub storage_failures: u64,
    pub journal_records: u64,
    pub journal_bytes: u64,
    pub sessions_opened: u64,
}
