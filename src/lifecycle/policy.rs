//! Lifecycle policy
//!
//! A pure mapping from `(status, major)` to the set of legal next actions.
//!
//! | status  | major | actions                  |
//! |---------|-------|--------------------------|
//! | Draft   | 0     | approve, edit, delete    |
//! | Draft   | >0    | approve, edit            |
//! | Final   | any   | new_version, inactivate  |
//! | Retired | any   | reactivate, delete       |

use std::collections::BTreeSet;

use super::Action;
use crate::version::ItemStatus;

/// Returns the actions legal for an item in `status` at major version `major`.
pub fn possible_actions(status: ItemStatus, major: u32) -> BTreeSet<Action> {
    let actions: &[Action] = match (status, major) {
        (ItemStatus::Draft, 0) => &[Action::Approve, Action::Edit, Action::Delete],
        (ItemStatus::Draft, _) => &[Action::Approve, Action::Edit],
        (ItemStatus::Final, _) => &[Action::NewVersion, Action::Inactivate],
        (ItemStatus::Retired, _) => &[Action::Reactivate, Action::Delete],
    };
    actions.iter().copied().collect()
}

/// True if `action` is legal in `(status, major)`.
pub fn is_allowed(action: Action, status: ItemStatus, major: u32) -> bool {
    possible_actions(status, major).contains(&action)
}

/// The delete guard: only unapproved items and retired items may be deleted.
pub fn is_deletable(status: ItemStatus, major: u32) -> bool {
    major == 0 || status == ItemStatus::Retired
}
