//! The scheduling engine and its search bounds.
//!
//! [`SchedulingEngine`] runs a bounded branch-and-bound search over
//! recording occurrences; [`ScheduleIter`] exposes the outcome stream
//! lazily. Bounds live in [`EngineConfig`].

mod engine;

pub use engine::{EngineConfig, ScheduleIter, SchedulingEngine};
