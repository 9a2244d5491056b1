//! HistoryRecord - immutable snapshot of one item version
//!
//! Every transition emits exactly one record. The only thing that ever
//! happens to a stored record is that it receives its `end_date` when the
//! next record supersedes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::version::VersionMetadata;

/// Snapshot of an item's payload and version metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord<P> {
    uid: String,
    /// Position in the item's history, starting at 1.
    revision: u64,
    metadata: VersionMetadata,
    payload: P,
}

impl<P> HistoryRecord<P> {
    /// Creates a record.
    pub fn new(uid: String, revision: u64, metadata: VersionMetadata, payload: P) -> Self {
        Self {
            uid,
            revision,
            metadata,
            payload,
        }
    }

    /// Returns the item uid.
    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the revision (1-based, strictly increasing per item).
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the version metadata snapshot.
    #[inline]
    pub fn metadata(&self) -> &VersionMetadata {
        &self.metadata
    }

    /// Returns the payload snapshot.
    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Splits the record into `(uid, revision, metadata, payload)`.
    pub fn into_parts(self) -> (String, u64, VersionMetadata, P) {
        (self.uid, self.revision, self.metadata, self.payload)
    }

    /// The record superseded at `end_date`.
    pub(crate) fn closed_at(self, end_date: DateTime<Utc>) -> Self {
        Self {
            metadata: self.metadata.closed_at(end_date),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_closed_at_keeps_identity() {
        let metadata = VersionMetadata::initial("alice");
        let end = metadata.start_date() + Duration::seconds(3);
        let record = HistoryRecord::new("Item_000001".to_string(), 1, metadata, "payload");

        let closed = record.clone().closed_at(end);
        assert_eq!(closed.uid(), record.uid());
        assert_eq!(closed.revision(), 1);
        assert_eq!(closed.payload(), &"payload");
        assert_eq!(closed.metadata().end_date(), Some(end));
        assert!(record.metadata().is_current());
    }
}
