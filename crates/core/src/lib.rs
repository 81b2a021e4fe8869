//! Domain types for the scene generation service.
//!
//! Everything in this crate is free of I/O: job identifiers, the job
//! record and its state machine, artifact naming, and submission
//! validation. The HTTP layer and the generation pipeline both build on
//! these types.

pub mod error;
pub mod job;
pub mod naming;
pub mod submission;
pub mod types;
