//! Lifecycle state machine
//!
//! This module provides:
//! - `Action` - operations a caller can request
//! - `policy` - the `(status, major) -> actions` table
//! - `LifecycleItem` - the generic aggregate and its transitions
//! - capability traits a content kind supplies to the engine

mod action;
mod capability;
mod item;
pub mod policy;

pub use action::Action;
pub use capability::{ItemPayload, JsonCodec, NameUniquenessChecker, PayloadCodec, UidGenerator};
pub use item::{LifecycleItem, StagedChange};
pub use policy::possible_actions;
