//! VersionMetadata - immutable versioning information of one history record
//!
//! A metadata value is never modified. Each transition builds a new value
//! from the previous one; equality is by value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemStatus, VersionNumber};
use crate::errors::{LifecycleError, LifecycleResult};

/// Change description of the very first record of an item.
pub const INITIAL_VERSION_LABEL: &str = "Initial version";
/// Default change description of an approval.
pub const FINAL_VERSION_LABEL: &str = "Approved version";
/// Default change description when a new draft is opened.
pub const NEW_VERSION_LABEL: &str = "New draft created";
/// Default change description of an inactivation.
pub const RETIRED_VERSION_LABEL: &str = "Inactivated version";
/// Default change description of a reactivation.
pub const REACTIVATED_VERSION_LABEL: &str = "Reactivated version";

/// Versioning information attached to a history record.
///
/// All fields are private to enforce immutability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    status: ItemStatus,
    version: VersionNumber,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    author: String,
    change_description: Option<String>,
}

impl VersionMetadata {
    /// Metadata of a freshly created item: Draft, `0.1`, starting now.
    pub fn initial(author: impl Into<String>) -> Self {
        Self::initial_at(author, Utc::now())
    }

    /// Same as [`VersionMetadata::initial`] with an explicit start date.
    pub fn initial_at(author: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            status: ItemStatus::Draft,
            version: VersionNumber::INITIAL,
            start_date,
            end_date: None,
            author: author.into(),
            change_description: Some(INITIAL_VERSION_LABEL.to_string()),
        }
    }

    /// Rebuilds metadata read back from storage, validating its invariants.
    pub fn from_repository_values(
        status: ItemStatus,
        version: VersionNumber,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        author: impl Into<String>,
        change_description: Option<String>,
    ) -> LifecycleResult<Self> {
        let metadata = Self {
            status,
            version,
            start_date,
            end_date,
            author: author.into(),
            change_description,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Checks the structural invariants of a metadata value.
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.version.major() == 0 && self.version.minor() == 0 {
            return Err(LifecycleError::InvalidInput(
                "version 0.0 is not a valid version".to_string(),
            ));
        }
        if self.version.is_unapproved() && self.status != ItemStatus::Draft {
            return Err(LifecycleError::InvalidInput(format!(
                "version {} has never been approved but status is {}",
                self.version, self.status
            )));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(LifecycleError::InvalidInput(format!(
                    "end date {} precedes start date {}",
                    end, self.start_date
                )));
            }
        }
        Ok(())
    }

    /// Builds the metadata of the next record, moving to `status`.
    ///
    /// The start date never precedes the start date of `self`, so records
    /// of one item are ordered in time as well as by revision.
    pub(crate) fn successor(
        &self,
        status: ItemStatus,
        author: impl Into<String>,
        change_description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            status,
            version: self.version.next_for(self.status, status),
            start_date: now.max(self.start_date),
            end_date: None,
            author: author.into(),
            change_description,
        }
    }

    /// Returns a copy of this metadata closed at `end_date`.
    pub(crate) fn closed_at(&self, end_date: DateTime<Utc>) -> Self {
        Self {
            end_date: Some(end_date.max(self.start_date)),
            ..self.clone()
        }
    }

    /// Returns the lifecycle status.
    #[inline]
    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Returns the version label.
    #[inline]
    pub fn version(&self) -> VersionNumber {
        self.version
    }

    /// Returns the major version component.
    #[inline]
    pub fn major(&self) -> u32 {
        self.version.major()
    }

    /// Returns the minor version component.
    #[inline]
    pub fn minor(&self) -> u32 {
        self.version.minor()
    }

    /// When this version became effective.
    #[inline]
    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// When this version was superseded, `None` while current.
    #[inline]
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// True while this version has not been superseded.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.end_date.is_none()
    }

    /// Who produced this version.
    #[inline]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Optional free-text description of the change.
    #[inline]
    pub fn change_description(&self) -> Option<&str> {
        self.change_description.as_deref()
    }
}
