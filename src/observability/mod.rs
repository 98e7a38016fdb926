//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle controller / supervisors produce:
//!     → logging.rs (LogSink lines for operators, tracing events)
//!     → metrics.rs (trigger counters, phase durations, exit status)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The sink is injectable so embedders can route lines anywhere
//! - Metrics are cheap (atomic increments, no-op without a recorder)

pub mod logging;
pub mod metrics;

pub use logging::{LogSink, TracingSink};
