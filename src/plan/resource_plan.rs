//! Per-resource allocation history within one candidate plan.
//!
//! A [`ResourcePlan`] tracks everything one resource has committed to
//! inside a single plan hypothesis: booked intervals, its own capacity
//! ledgers (tuner slots and the device's decryption limit), the per-source
//! usage timeline (used to detect the same physical source being received
//! on two resources at once), the log of distinct activation instants,
//! and the accumulated cost of occurrences that could not be placed.
//!
//! Admission is all-or-nothing: `try_add` commits an occurrence to every
//! relevant ledger or to none. There is no partial or truncated booking;
//! the cut counters account for occurrences that were dropped outright.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{RecurringEvent, Resource, ScopeId, TimeWindow};

use super::CapacityLedger;

/// One booked recording interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// The event this booking serves.
    pub event_id: String,
    /// The booked interval.
    pub window: TimeWindow,
}

/// One resource's allocation history inside a candidate plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePlan {
    /// Index of the owning resource within the resource set.
    resource_index: usize,
    /// Booked intervals, sorted by start.
    bookings: Vec<Booking>,
    /// Own tuner-slot usage (capacity = source limit).
    ledger: CapacityLedger,
    /// Own decrypted-source usage (capacity = decryption limit).
    decrypted: CapacityLedger,
    /// Usage timeline per source id.
    source_usage: HashMap<String, Vec<TimeWindow>>,
    /// Distinct, non-contiguous activation instants.
    activations: Vec<DateTime<Utc>>,
    /// Accumulated recording time lost to dropped occurrences.
    #[serde(with = "crate::models::duration_millis")]
    total_cut: Duration,
    /// Number of dropped occurrences.
    cut_recordings: u32,
}

impl ResourcePlan {
    /// Creates an empty plan for the resource at `resource_index`.
    pub fn new(resource_index: usize, resource: &Resource) -> Self {
        Self {
            resource_index,
            bookings: Vec::new(),
            ledger: CapacityLedger::new(resource.source_limit),
            decrypted: CapacityLedger::new(resource.decryption_limit),
            source_usage: HashMap::new(),
            activations: Vec::new(),
            total_cut: Duration::zero(),
            cut_recordings: 0,
        }
    }

    /// Attempts to book `window` for `event` on this resource.
    ///
    /// Checks the capability filter, the resource's own source and
    /// decryption limits, and (for encrypted sources) every shared
    /// decryption scope the resource belongs to. Only when every check
    /// passes is the interval committed to all relevant ledgers.
    pub fn try_add(
        &mut self,
        resource: &Resource,
        scope_ids: &[ScopeId],
        event: &RecurringEvent,
        window: &TimeWindow,
        scope_ledgers: &mut [CapacityLedger],
    ) -> bool {
        if !resource.test_access(&event.source) {
            return false;
        }
        if !self.ledger.has_headroom(window) {
            return false;
        }
        if event.source.encrypted {
            if !self.decrypted.has_headroom(window) {
                return false;
            }
            for &scope in scope_ids {
                if !scope_ledgers[scope].has_headroom(window) {
                    return false;
                }
            }
        }

        self.ledger.add(window);
        if event.source.encrypted {
            self.decrypted.add(window);
            for &scope in scope_ids {
                scope_ledgers[scope].add(window);
            }
        }

        if !self.active_at_or_adjacent(window.start) {
            self.activations.push(window.start);
        }
        self.source_usage
            .entry(event.source.id.clone())
            .or_default()
            .push(*window);

        let at = self
            .bookings
            .iter()
            .position(|b| b.window.start > window.start)
            .unwrap_or(self.bookings.len());
        self.bookings.insert(
            at,
            Booking {
                event_id: event.id.clone(),
                window: *window,
            },
        );
        true
    }

    /// Accounts for an occurrence that could not be placed anywhere.
    pub fn record_cut(&mut self, window: &TimeWindow) {
        self.total_cut += window.duration;
        self.cut_recordings += 1;
    }

    /// Forks into a plan whose history before `pivot` is discarded.
    ///
    /// Bookings, source usage, and activations starting before the pivot
    /// are dropped; the own ledgers are clipped at the pivot so that
    /// in-progress usage keeps consuming capacity. Cut accounting is
    /// cumulative and survives the restart.
    pub fn restart(&self, pivot: DateTime<Utc>) -> Self {
        let bookings = self
            .bookings
            .iter()
            .filter(|b| b.window.start >= pivot)
            .cloned()
            .collect();
        let mut source_usage: HashMap<String, Vec<TimeWindow>> = HashMap::new();
        for (source, windows) in &self.source_usage {
            let kept: Vec<_> = windows
                .iter()
                .filter(|w| w.end() > pivot)
                .map(|w| {
                    if w.start >= pivot {
                        *w
                    } else {
                        TimeWindow::from_range(pivot, w.end())
                    }
                })
                .collect();
            if !kept.is_empty() {
                source_usage.insert(source.clone(), kept);
            }
        }
        Self {
            resource_index: self.resource_index,
            bookings,
            ledger: self.ledger.fork(Some(pivot)),
            decrypted: self.decrypted.fork(Some(pivot)),
            source_usage,
            activations: self
                .activations
                .iter()
                .copied()
                .filter(|&t| t >= pivot)
                .collect(),
            total_cut: self.total_cut,
            cut_recordings: self.cut_recordings,
        }
    }

    /// Index of the owning resource.
    pub fn resource_index(&self) -> usize {
        self.resource_index
    }

    /// Booked intervals, sorted by start.
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Whether this resource has at least one booking.
    pub fn busy(&self) -> bool {
        !self.bookings.is_empty()
    }

    /// Own tuner-slot ledger.
    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }

    /// Usage timeline for one source id.
    pub fn source_usage(&self, source_id: &str) -> &[TimeWindow] {
        self.source_usage
            .get(source_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ids of all sources this plan has received.
    pub fn used_sources(&self) -> impl Iterator<Item = &str> {
        self.source_usage.keys().map(String::as_str)
    }

    /// Distinct non-contiguous activation instants, in booking order.
    pub fn activations(&self) -> &[DateTime<Utc>] {
        &self.activations
    }

    /// Accumulated lost recording time.
    pub fn total_cut(&self) -> Duration {
        self.total_cut
    }

    /// Number of dropped occurrences.
    pub fn cut_recordings(&self) -> u32 {
        self.cut_recordings
    }

    /// Earliest booked start, if any.
    pub fn earliest_start(&self) -> Option<DateTime<Utc>> {
        self.bookings.first().map(|b| b.window.start)
    }

    /// Latest booked end, if any.
    pub fn latest_end(&self) -> Option<DateTime<Utc>> {
        self.bookings.iter().map(|b| b.window.end()).max()
    }

    /// Idle gaps between consecutive bookings.
    pub fn idle_gaps(&self) -> Vec<TimeWindow> {
        let mut gaps = Vec::new();
        let mut busy_until: Option<DateTime<Utc>> = None;
        for b in &self.bookings {
            if let Some(until) = busy_until {
                if b.window.start > until {
                    gaps.push(TimeWindow::from_range(until, b.window.start));
                }
            }
            busy_until = Some(match busy_until {
                Some(until) => until.max(b.window.end()),
                None => b.window.end(),
            });
        }
        gaps
    }

    /// Whether the resource is running at `time` or stops/starts exactly
    /// there (a back-to-back booking is not a new activation).
    fn active_at_or_adjacent(&self, time: DateTime<Utc>) -> bool {
        self.bookings
            .iter()
            .any(|b| b.window.start <= time && time <= b.window.end())
    }

    /// Whether some booking is running at `time`, its start excluded.
    pub fn running_at(&self, time: DateTime<Utc>) -> bool {
        self.bookings
            .iter()
            .any(|b| b.window.start < time && time < b.window.end())
    }
}
