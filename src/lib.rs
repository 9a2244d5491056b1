//! mdr_lifecycle - generic lifecycle and versioning engine
//!
//! Every managed item moves through Draft → Final → Retired with a
//! `major.minor` version, and every transition appends an immutable history
//! record. The same engine serves any payload type implementing
//! [`lifecycle::ItemPayload`].
//!
//! - [`library`]: editability domains items are created in
//! - [`version`]: status, version numbers and version metadata
//! - [`lifecycle`]: the policy and the aggregate state machine
//! - [`repository`]: persistence contract, memory and journal-backed stores
//! - [`engine`]: load-for-update → transition → save in one call
//! - [`observability`]: structured logs, events and metrics
//! - [`config`] and [`cli`]: the operator tool

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod library;
pub mod lifecycle;
pub mod observability;
pub mod payload;
pub mod repository;
pub mod version;

pub use config::EngineConfig;
pub use engine::{shared_libraries, LifecycleEngine, SharedLibraries};
pub use errors::{ErrorKind, LifecycleError, LifecycleResult};
pub use payload::GenericPayload;
