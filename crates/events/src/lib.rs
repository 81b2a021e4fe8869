//! Job lifecycle event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`]: snapshot of a job's status after each transition.
//! - [`log_events`]: background listener that writes every event to the
//!   tracing log.

pub mod bus;
pub mod listener;

pub use bus::{EventBus, JobEvent};
pub use listener::log_events;
