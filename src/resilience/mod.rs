//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Startup / teardown action:
//!     → timeouts.rs (spawn action, race it against its deadline)
//!     → Ok(value) | Err(Action | Panicked | Timeout)
//!     → lifecycle controller picks the next transition
//! ```
//!
//! # Design Decisions
//! - Every awaited action has a deadline
//! - Nothing is retried; a failed phase escalates to teardown

pub mod timeouts;

pub use timeouts::guard;
