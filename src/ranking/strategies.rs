//! Built-in ranking strategies.
//!
//! Each strategy is a small unit struct implementing
//! [`RankingStrategy`](super::RankingStrategy); `Ordering::Less` always
//! means the first plan ranks ahead.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::plan::CandidatePlan;

use super::RankingStrategy;

/// Ranks plans by total lost recording time, ascending.
///
/// Primary key: the sum of cut time across all resources — the plan that
/// loses less recording time ranks ahead. When the cut time is tied and
/// non-zero, the plan that dropped fewer recordings ranks ahead.
#[derive(Debug, Clone, Copy)]
pub struct TotalCut;

impl RankingStrategy for TotalCut {
    fn name(&self) -> &'static str {
        "TotalCut"
    }

    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering {
        let total = |plan: &CandidatePlan| {
            plan.resource_plans()
                .iter()
                .fold(Duration::zero(), |acc, p| acc + p.total_cut())
        };
        let cut_a = total(a);
        let cut_b = total(b);
        let by_time = cut_a.cmp(&cut_b);
        if by_time != Ordering::Equal {
            return by_time;
        }
        if cut_a == Duration::zero() {
            return Ordering::Equal;
        }
        let count_a: u32 = a.resource_plans().iter().map(|p| p.cut_recordings()).sum();
        let count_b: u32 = b.resource_plans().iter().map(|p| p.cut_recordings()).sum();
        count_a.cmp(&count_b)
    }
}

/// Ranks plans by duplicated source reception time, ascending.
///
/// For every distinct physical source, merges each resource's usage
/// timeline for that source and sums the time the source is received on
/// more than one resource simultaneously (weighted by the excess over
/// one). Less duplication ranks ahead.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateSourceTime;

impl DuplicateSourceTime {
    /// Total excess-over-one reception time across all sources.
    pub fn duplicate_time(plan: &CandidatePlan) -> Duration {
        let sources: BTreeSet<&str> = plan
            .resource_plans()
            .iter()
            .flat_map(|p| p.used_sources())
            .collect();

        let mut total = Duration::zero();
        for source in sources {
            // Merge each resource's timeline first: a resource receives a
            // source at most once physically, however many recordings
            // share it. Then sweep the merged intervals across resources.
            let mut edges: Vec<(DateTime<Utc>, i32)> = Vec::new();
            for rp in plan.resource_plans() {
                for w in merge_windows(rp.source_usage(source)) {
                    edges.push((w.0, 1));
                    edges.push((w.1, -1));
                }
            }
            edges.sort();

            let mut active = 0i32;
            let mut last: Option<DateTime<Utc>> = None;
            for (time, delta) in edges {
                if let Some(prev) = last {
                    if active > 1 {
                        total = total + (time - prev) * (active - 1);
                    }
                }
                active += delta;
                last = Some(time);
            }
        }
        total
    }
}

/// Coalesces overlapping or touching windows into disjoint intervals.
fn merge_windows(
    windows: &[crate::models::TimeWindow],
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        windows.iter().map(|w| (w.start, w.end())).collect();
    spans.sort();
    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

impl RankingStrategy for DuplicateSourceTime {
    fn name(&self) -> &'static str {
        "DuplicateSourceTime"
    }

    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering {
        Self::duplicate_time(a).cmp(&Self::duplicate_time(b))
    }
}

/// Ranks plans by the number of resources carrying at least one booking,
/// ascending — fewer active devices ranks ahead.
#[derive(Debug, Clone, Copy)]
pub struct ResourceCount;

impl RankingStrategy for ResourceCount {
    fn name(&self) -> &'static str {
        "ResourceCount"
    }

    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering {
        let count = |plan: &CandidatePlan| {
            plan.resource_plans().iter().filter(|p| p.busy()).count()
        };
        count(a).cmp(&count(b))
    }
}
