//! Job execution engine.
//!
//! The [`registry`] holds every job record, the [`dispatcher`] admits
//! submissions and launches one background task per job, and the
//! [`executor`] drives a single job through the generation backend and the
//! artifact store.

pub mod dispatcher;
pub mod executor;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use executor::JobExecutor;
pub use registry::{JobRegistry, StatusCounts};
