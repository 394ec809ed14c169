//! Scheduling domain models.
//!
//! The read-only inputs of a scheduling run: recording requests
//! ([`RecurringEvent`]), devices ([`Resource`]) and shared decryption
//! scopes ([`DecryptionGroup`]), collected into a priority-ordered
//! [`ResourceSet`]. Collaborators construct these once per run; the
//! engine never mutates them.

pub(crate) use window::duration_millis;

mod event;
mod group;
mod resource;
mod set;
mod window;

pub use event::{DayException, OccurrenceCursor, RecurringEvent, RepeatMask, SourceRef};
pub use group::DecryptionGroup;
pub use resource::{
    Resource, SourceFilter, DECRYPTION_LIMIT_KEY, DEFAULT_DECRYPTION_LIMIT, DEFAULT_PRIORITY,
    DEFAULT_SOURCE_LIMIT, PRIORITY_KEY, SOURCE_LIMIT_KEY,
};
pub use set::{ResourceSet, Scope, ScopeId};
pub use window::TimeWindow;
