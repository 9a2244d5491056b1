//! ItemStatus - where an item sits in its lifecycle

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::LifecycleError;

/// Lifecycle status of a library item.
///
/// `Draft` is the only initial state. No state is terminal: a retired item
/// can be reactivated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Editable, not yet approved
    Draft,
    /// Approved and authoritative
    Final,
    /// Deactivated
    Retired,
}

impl ItemStatus {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "Draft",
            ItemStatus::Final => "Final",
            ItemStatus::Retired => "Retired",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(ItemStatus::Draft),
            "final" => Ok(ItemStatus::Final),
            "retired" => Ok(ItemStatus::Retired),
            other => Err(LifecycleError::InvalidInput(format!(
                "unknown status '{}'",
                other
            ))),
        }
    }
}
