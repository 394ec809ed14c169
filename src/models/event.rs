//! Recording request model and occurrence expansion.
//!
//! A [`RecurringEvent`] is a schedulable request: one-shot, or repeating on
//! a weekday mask up to an optional end date, with per-day exceptions that
//! shift the start, alter the duration, or suppress a single day entirely.
//!
//! [`OccurrenceCursor`] expands an event into a chronologically ordered,
//! restartable stream of concrete [`TimeWindow`]s. It is a pure generator:
//! expansion has no side effects on the event.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TimeWindow;

/// Reference to a physical broadcast source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source identifier (e.g. a service or transponder key).
    pub id: String,
    /// Whether receiving this source consumes a decryption slot.
    pub encrypted: bool,
}

impl SourceRef {
    /// Creates a free-to-air source reference.
    pub fn clear(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            encrypted: false,
        }
    }

    /// Creates an encrypted source reference.
    pub fn encrypted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            encrypted: true,
        }
    }
}

/// A set of weekdays on which a repeating event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepeatMask(u8);

impl RepeatMask {
    /// Empty mask: no weekday selected.
    pub fn none() -> Self {
        Self(0)
    }

    /// Every day of the week.
    pub fn daily() -> Self {
        Self(0b0111_1111)
    }

    /// Monday through Friday.
    pub fn weekdays_only() -> Self {
        Self::from_days(&[
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ])
    }

    /// Mask from an explicit weekday list.
    pub fn from_days(days: &[Weekday]) -> Self {
        let mut bits = 0u8;
        for d in days {
            bits |= 1 << d.num_days_from_monday();
        }
        Self(bits)
    }

    /// Whether the mask selects the given weekday.
    #[inline]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// Whether no weekday is selected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A per-day override for one occurrence of a repeating event.
///
/// At most one exception applies per calendar day. The exception may shift
/// the start, change the duration, or both; a duration delta that drives
/// the effective duration to zero or below suppresses the occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayException {
    /// The calendar day this exception applies to.
    pub date: NaiveDate,
    /// Offset added to the day's nominal start.
    #[serde(with = "crate::models::duration_millis")]
    pub start_shift: Duration,
    /// Signed change to the day's nominal duration.
    #[serde(with = "crate::models::duration_millis")]
    pub duration_delta: Duration,
}

impl DayException {
    /// Creates a no-op exception for a day.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            start_shift: Duration::zero(),
            duration_delta: Duration::zero(),
        }
    }

    /// Sets the start shift.
    pub fn with_shift(mut self, shift: Duration) -> Self {
        self.start_shift = shift;
        self
    }

    /// Sets the duration delta.
    pub fn with_duration_delta(mut self, delta: Duration) -> Self {
        self.duration_delta = delta;
        self
    }
}

/// A recording request: one-shot or repeating with per-day exceptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringEvent {
    /// Unique event identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The source to record.
    pub source: SourceRef,
    /// Resources allowed to serve this event. `None` = any resource.
    pub allowed_resources: Option<Vec<String>>,
    /// The first (nominal) occurrence. Its time of day is reused on every
    /// repeat day.
    pub first: TimeWindow,
    /// Weekday repeat mask. `None` = one-shot.
    pub repeat: Option<RepeatMask>,
    /// Last calendar day on which the event may fire (inclusive).
    pub until: Option<NaiveDate>,
    /// Per-day exceptions, keyed by date (one per day, last insert wins).
    pub exceptions: BTreeMap<NaiveDate, DayException>,
}

impl RecurringEvent {
    /// Creates a one-shot event.
    pub fn new(id: impl Into<String>, source: SourceRef, first: TimeWindow) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            source,
            allowed_resources: None,
            first,
            repeat: None,
            until: None,
            exceptions: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restricts the event to a subset of resources.
    pub fn with_allowed_resources(mut self, names: Vec<String>) -> Self {
        self.allowed_resources = Some(names);
        self
    }

    /// Makes the event repeat on the given weekday mask.
    pub fn with_repeat(mut self, mask: RepeatMask) -> Self {
        self.repeat = Some(mask);
        self
    }

    /// Sets the last day the event may fire (inclusive).
    pub fn with_until(mut self, date: NaiveDate) -> Self {
        self.until = Some(date);
        self
    }

    /// Adds a per-day exception. A later exception for the same date
    /// replaces the earlier one.
    pub fn with_exception(mut self, exception: DayException) -> Self {
        self.exceptions.insert(exception.date, exception);
        self
    }

    /// Whether a given resource name may serve this event.
    pub fn allows_resource(&self, name: &str) -> bool {
        match &self.allowed_resources {
            None => true,
            Some(list) => list.iter().any(|n| n == name),
        }
    }

    /// The concrete occurrence on a calendar day, if any.
    ///
    /// Applies the weekday mask, end date, and per-day exception. Returns
    /// `None` when the day is outside the repeat pattern or the exception
    /// suppresses it (effective duration ≤ 0).
    fn occurrence_on(&self, date: NaiveDate) -> Option<TimeWindow> {
        let first_date = self.first.start.date_naive();
        match self.repeat {
            None => {
                if date != first_date {
                    return None;
                }
            }
            Some(mask) => {
                if date < first_date {
                    return None;
                }
                if let Some(until) = self.until {
                    if date > until {
                        return None;
                    }
                }
                if !mask.contains(date.weekday()) {
                    return None;
                }
            }
        }

        let nominal = Utc
            .from_utc_datetime(&date.and_time(self.first.start.time()));
        let (start, duration) = match self.exceptions.get(&date) {
            Some(ex) => (
                nominal + ex.start_shift,
                self.first.duration + ex.duration_delta,
            ),
            None => (nominal, self.first.duration),
        };
        if duration <= Duration::zero() {
            return None;
        }
        Some(TimeWindow::new(start, duration))
    }
}

/// Chronological cursor over an event's concrete occurrences.
///
/// `reset` positions the cursor at the first occurrence whose start is at
/// or after the given instant, or whose window is still in progress at
/// that instant. `advance` moves to the next occurrence; once exhausted
/// the cursor yields nothing further.
#[derive(Debug, Clone)]
pub struct OccurrenceCursor<'a> {
    event: &'a RecurringEvent,
    /// Day under the cursor; `None` once exhausted.
    date: Option<NaiveDate>,
    current: Option<TimeWindow>,
}

impl<'a> OccurrenceCursor<'a> {
    /// Creates a cursor positioned at the event's first occurrence.
    pub fn new(event: &'a RecurringEvent) -> Self {
        let mut cursor = Self {
            event,
            date: None,
            current: None,
        };
        cursor.reset(DateTime::<Utc>::MIN_UTC);
        cursor
    }

    /// The occurrence under the cursor, or `None` when exhausted.
    pub fn current(&self) -> Option<TimeWindow> {
        self.current
    }

    /// The event this cursor expands.
    pub fn event(&self) -> &'a RecurringEvent {
        self.event
    }

    /// Repositions the cursor at the first occurrence with start ≥
    /// `min_time`, or whose window is still in progress at `min_time`.
    pub fn reset(&mut self, min_time: DateTime<Utc>) {
        self.current = None;
        self.date = None;

        // A repeating event with an empty mask yields nothing.
        if matches!(self.event.repeat, Some(mask) if mask.is_empty()) {
            return;
        }

        let first_date = self.event.first.start.date_naive();
        let mut date = first_date.max(min_time.date_naive().pred_opt().unwrap_or(first_date));
        loop {
            if self.out_of_range(date) {
                return;
            }
            if let Some(window) = self.event.occurrence_on(date) {
                if window.start >= min_time || window.end() > min_time {
                    self.date = Some(date);
                    self.current = Some(window);
                    return;
                }
            }
            date = match date.succ_opt() {
                Some(d) => d,
                None => return,
            };
        }
    }

    /// Moves to the next occurrence, or exhausts the cursor.
    pub fn advance(&mut self) {
        let Some(mut date) = self.date else {
            return;
        };
        self.current = None;
        loop {
            date = match date.succ_opt() {
                Some(d) => d,
                None => {
                    self.date = None;
                    return;
                }
            };
            if self.out_of_range(date) {
                self.date = None;
                return;
            }
            if let Some(window) = self.event.occurrence_on(date) {
                self.date = Some(date);
                self.current = Some(window);
                return;
            }
        }
    }

    /// Whether `date` is past the last day the event can possibly fire.
    fn out_of_range(&self, date: NaiveDate) -> bool {
        match self.event.repeat {
            None => date > self.event.first.start.date_naive(),
            Some(_) => match self.event.until {
                Some(until) => date > until,
                None => false,
            },
        }
    }
}
