//! Time-partitioned capacity ledger.
//!
//! A [`CapacityLedger`] counts usage-over-time for one capacity scope: a
//! resource's own tuner slots, or a shared decryption scope. It keeps a
//! compacted list of non-overlapping segments, each carrying the number
//! of concurrent users over its interval.
//!
//! The ledger only records. Headroom must be verified by the caller (via
//! [`CapacityLedger::peak`]) before committing an interval; rejection
//! policy lives in the resource plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::TimeWindow;

/// One usage segment: `count` concurrent users over `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start (inclusive).
    pub start: DateTime<Utc>,
    /// Segment end (exclusive).
    pub end: DateTime<Utc>,
    /// Concurrent usage count over the segment.
    pub count: i32,
}

/// Usage-over-time counter with a maximum concurrent count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLedger {
    capacity: i32,
    /// Sorted, non-overlapping, compacted; counts are always > 0.
    segments: Vec<Segment>,
}

impl CapacityLedger {
    /// Creates an empty ledger with the given capacity.
    pub fn new(capacity: i32) -> Self {
        Self {
            capacity,
            segments: Vec::new(),
        }
    }

    /// The configured maximum concurrent count.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// The compacted usage segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether one more concurrent user fits everywhere in `window`.
    pub fn has_headroom(&self, window: &TimeWindow) -> bool {
        self.peak(window) < self.capacity
    }

    /// Maximum usage count over `window` (0 when unused).
    pub fn peak(&self, window: &TimeWindow) -> i32 {
        let end = window.end();
        self.segments
            .iter()
            .filter(|s| s.start < end && window.start < s.end)
            .map(|s| s.count)
            .max()
            .unwrap_or(0)
    }

    /// Increments the usage count over `window`.
    ///
    /// Recording only: the ledger accepts the interval even when the
    /// resulting count exceeds capacity. Callers check headroom first.
    pub fn add(&mut self, window: &TimeWindow) {
        if window.is_empty() {
            return;
        }
        let end = window.end();

        let mut bounds: BTreeSet<DateTime<Utc>> = BTreeSet::new();
        bounds.insert(window.start);
        bounds.insert(end);
        for seg in &self.segments {
            bounds.insert(seg.start);
            bounds.insert(seg.end);
        }
        let bounds: Vec<_> = bounds.into_iter().collect();

        let mut rebuilt = Vec::with_capacity(self.segments.len() + 2);
        for pair in bounds.windows(2) {
            let (s, e) = (pair[0], pair[1]);
            let mut count = self.count_at(s);
            if s >= window.start && e <= end {
                count += 1;
            }
            if count > 0 {
                rebuilt.push(Segment {
                    start: s,
                    end: e,
                    count,
                });
            }
        }
        self.segments = compact(rebuilt);
    }

    /// Produces an independent copy.
    ///
    /// With a pivot, usage before the pivot is discarded: segments ending
    /// at or before the pivot are dropped and a straddling segment is
    /// clipped at the pivot. Capacity and post-pivot usage are preserved.
    pub fn fork(&self, pivot: Option<DateTime<Utc>>) -> Self {
        let Some(pivot) = pivot else {
            return self.clone();
        };
        let segments = self
            .segments
            .iter()
            .filter(|s| s.end > pivot)
            .map(|s| Segment {
                start: s.start.max(pivot),
                end: s.end,
                count: s.count,
            })
            .collect();
        Self {
            capacity: self.capacity,
            segments: compact(segments),
        }
    }

    /// Usage count at a single instant.
    fn count_at(&self, time: DateTime<Utc>) -> i32 {
        self.segments
            .iter()
            .find(|s| s.start <= time && time < s.end)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}

/// Merges contiguous segments with equal counts.
fn compact(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        match out.last_mut() {
            Some(last) if last.end == seg.start && last.count == seg.count => {
                last.end = seg.end;
            }
            _ => out.push(seg),
        }
    }
    out
}
