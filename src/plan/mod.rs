//! Allocation state: capacity ledgers, per-resource plans, and whole-system
//! candidate plans.
//!
//! These are the mutable value-like structures the search forks and
//! discards continuously. They carry no internal locking; the engine's
//! single-search-at-a-time discipline is the concurrency model.

mod candidate;
mod ledger;
mod resource_plan;

pub use candidate::{CandidatePlan, ScheduleResult};
pub use ledger::{CapacityLedger, Segment};
pub use resource_plan::{Booking, ResourcePlan};
