//! Broadcast-recording scheduler.
//!
//! Places the occurrences of recurring recording requests onto a set of
//! capacity-limited reception resources, resolving contention with a
//! bounded branch-and-bound search over whole-system candidate plans.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `RecurringEvent`, `OccurrenceCursor`,
//!   `Resource`, `DecryptionGroup`, `ResourceSet`, `TimeWindow`
//! - **`plan`**: Allocation state — `CapacityLedger`, `ResourcePlan`,
//!   `CandidatePlan`, `ScheduleResult`
//! - **`ranking`**: Pluggable plan comparators and the start-order rule
//!   file
//! - **`scheduler`**: The search engine and its bounds
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use recsched::models::{RecurringEvent, Resource, SourceRef, TimeWindow};
//! use recsched::scheduler::SchedulingEngine;
//!
//! let mut engine = SchedulingEngine::new();
//! engine.add_resource(Resource::new("tuner-1").with_source_limit(2))?;
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap();
//! engine.add_event(RecurringEvent::new(
//!     "evening-news",
//!     SourceRef::clear("MUX-A"),
//!     TimeWindow::new(start, Duration::hours(1)),
//! ));
//!
//! for result in engine.run(start - Duration::hours(1)) {
//!     println!("{}: {:?} ({})", result.event_id, result.resource, result.scheduled);
//! }
//! # Ok::<(), recsched::error::SchedulerError>(())
//! ```

pub mod error;
pub mod models;
pub mod plan;
pub mod ranking;
pub mod scheduler;

pub use error::SchedulerError;
pub use models::{
    DayException, DecryptionGroup, OccurrenceCursor, RecurringEvent, RepeatMask, Resource,
    ResourceSet, SourceRef, TimeWindow,
};
pub use plan::{CandidatePlan, ScheduleResult};
pub use ranking::{DefaultRanking, RankingStrategy, RuleSet, StartOrderRules};
pub use scheduler::{EngineConfig, ScheduleIter, SchedulingEngine};
