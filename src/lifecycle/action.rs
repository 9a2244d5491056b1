//! Action - the lifecycle operations a caller can request

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::LifecycleError;

/// Operations that change an item's lifecycle state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Edit,
    Delete,
    NewVersion,
    Inactivate,
    Reactivate,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 6] = [
        Action::Approve,
        Action::Edit,
        Action::Delete,
        Action::NewVersion,
        Action::Inactivate,
        Action::Reactivate,
    ];

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::NewVersion => "new_version",
            Action::Inactivate => "inactivate",
            Action::Reactivate => "reactivate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Action {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| LifecycleError::InvalidInput(format!("unknown action '{}'", s)))
    }
}
