//! Journal entry body
//!
//! One entry per successful save: the item it touched, the revision it was
//! validated against, and the staged changes in order. Payloads go through
//! the caller's `PayloadCodec` and are stored base64-encoded, so the entry
//! itself stays plain JSON whatever the payload format is.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::errors::{LifecycleError, LifecycleResult};
use crate::lifecycle::{PayloadCodec, StagedChange};
use crate::repository::HistoryRecord;
use crate::version::VersionMetadata;

/// A persisted change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalChange {
    Record {
        revision: u64,
        metadata: VersionMetadata,
        payload: String,
    },
    SoftDelete,
    Erase,
}

/// Body of one journal frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub uid: String,
    pub library: String,
    /// Current revision the save was validated against, `None` for creates.
    pub base_revision: Option<u64>,
    pub changes: Vec<JournalChange>,
}

impl JournalEntry {
    /// Encodes the staged changes of one save.
    pub fn from_changes<P, C>(
        uid: &str,
        library: &str,
        base_revision: Option<u64>,
        changes: &[StagedChange<P>],
        codec: &C,
    ) -> LifecycleResult<Self>
    where
        C: PayloadCodec<P> + ?Sized,
    {
        let changes = changes
            .iter()
            .map(|change| match change {
                StagedChange::Record(record) => Ok(JournalChange::Record {
                    revision: record.revision(),
                    metadata: record.metadata().clone(),
                    payload: STANDARD.encode(codec.encode(record.payload())?),
                }),
                StagedChange::SoftDelete => Ok(JournalChange::SoftDelete),
                StagedChange::Erase => Ok(JournalChange::Erase),
            })
            .collect::<LifecycleResult<Vec<_>>>()?;

        Ok(Self {
            uid: uid.to_string(),
            library: library.to_string(),
            base_revision,
            changes,
        })
    }

    /// Decodes the changes back into their staged form.
    pub fn to_changes<P, C>(&self, codec: &C) -> LifecycleResult<Vec<StagedChange<P>>>
    where
        C: PayloadCodec<P> + ?Sized,
    {
        self.changes
            .iter()
            .map(|change| match change {
                JournalChange::Record {
                    revision,
                    metadata,
                    payload,
                } => {
                    let bytes = STANDARD
                        .decode(payload)
                        .map_err(|e| LifecycleError::Codec(e.to_string()))?;
                    metadata.validate()?;
                    Ok(StagedChange::Record(HistoryRecord::new(
                        self.uid.clone(),
                        *revision,
                        metadata.clone(),
                        codec.decode(&bytes)?,
                    )))
                }
                JournalChange::SoftDelete => Ok(StagedChange::SoftDelete),
                JournalChange::Erase => Ok(StagedChange::Erase),
            })
            .collect()
    }

    pub fn to_bytes(&self) -> LifecycleResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> LifecycleResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
