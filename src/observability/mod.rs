//! Observability: structured JSON logs, lifecycle events and counters
//!
//! Observability is read-only. It has no side effects on tracking, runs no
//! background threads, and a failed log write is ignored.
//!
//! ```ignore
//! use shelfwatch::observability::{Logger, Event, MetricsRegistry, ObservationScope};
//!
//! Logger::info("STORE_OPENED", &[("data_dir", "/var/lib/shelfwatch")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_cycles();
//!
//! let scope = ObservationScope::with_fields("CYCLE", &[("patron", "Alice")]);
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event with fields at INFO, or FATAL for fatal events
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
