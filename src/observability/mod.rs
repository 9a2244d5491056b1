//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Counter metrics
//! - Begin/complete scopes for long steps such as journal replay
//!
//! Observability is read-only: nothing here can fail an operation.
//!
//! # Usage
//!
//! ```ignore
//! use mdr_lifecycle::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::ItemApproved, &[("uid", "Item_000001")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_created();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

fn severity_of(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_rejection() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
