//! Version metadata types
//!
//! - `ItemStatus` - Draft / Final / Retired
//! - `VersionNumber` - `major.minor` label and its increment rules
//! - `VersionMetadata` - immutable versioning value of a history record

mod metadata;
mod number;
mod status;

pub use metadata::{
    VersionMetadata, FINAL_VERSION_LABEL, INITIAL_VERSION_LABEL, NEW_VERSION_LABEL,
    REACTIVATED_VERSION_LABEL, RETIRED_VERSION_LABEL,
};
pub use number::VersionNumber;
pub use status::ItemStatus;
