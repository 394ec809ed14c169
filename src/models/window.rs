//! Time window model.
//!
//! The basic interval currency of the scheduler: a start instant plus a
//! duration, with the end derived. Used for candidate occurrences, booked
//! recordings, and capacity-ledger segments alike.
//!
//! # Time Model
//! All instants are UTC (`chrono::DateTime<Utc>`). Windows are half-open:
//! the start is included, the end excluded.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A time interval `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Interval start (UTC, inclusive).
    pub start: DateTime<Utc>,
    /// Interval length. Never negative.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl TimeWindow {
    /// Creates a new window. A negative duration is clamped to zero.
    pub fn new(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            duration: duration.max(Duration::zero()),
        }
    }

    /// Creates a window from explicit start and end instants.
    pub fn from_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(start, end - start)
    }

    /// Interval end (exclusive).
    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Whether the window is empty (zero duration).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.duration == Duration::zero()
    }

    /// Whether an instant falls within this window.
    #[inline]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end()
    }

    /// Whether two windows overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// The overlapping portion of two windows, if any.
    pub fn intersection_with(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if end > start {
            Some(Self::from_range(start, end))
        } else {
            None
        }
    }
}

/// Serde adapter: `chrono::Duration` as signed milliseconds.
pub(crate) mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.num_milliseconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::milliseconds(i64::deserialize(d)?))
    }
}
