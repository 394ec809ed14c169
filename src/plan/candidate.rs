//! Candidate plan: one complete scheduling hypothesis.
//!
//! A [`CandidatePlan`] holds one [`ResourcePlan`] per resource (in
//! priority order) and one shared [`CapacityLedger`] per decryption
//! scope. The engine forks plans continuously during the search; exactly
//! one survives each pruning step and becomes the new search root.
//!
//! Restarting pivots per-resource history at a time boundary while the
//! decryption ledgers are preserved in full: shared capacity commitments
//! must never be forgotten, only per-resource detail may be pruned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::SchedulerError;
use crate::models::{RecurringEvent, ResourceSet, TimeWindow};
use crate::ranking::RankingStrategy;

use super::{CapacityLedger, ResourcePlan};

/// One emitted scheduling outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// The request this outcome belongs to.
    pub event_id: String,
    /// The chosen resource, or `None` for a failed placement.
    pub resource: Option<String>,
    /// The occurrence window.
    pub window: TimeWindow,
    /// Whether the occurrence was placed.
    pub scheduled: bool,
}

impl ScheduleResult {
    /// A successful placement.
    pub fn scheduled(
        event_id: impl Into<String>,
        resource: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            resource: Some(resource.into()),
            window,
            scheduled: true,
        }
    }

    /// A lost occurrence (no resource could take it).
    pub fn failure(event_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            event_id: event_id.into(),
            resource: None,
            window,
            scheduled: false,
        }
    }
}

/// One complete hypothesis across all resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePlan {
    /// One plan per resource, parallel to the resource set's order.
    resource_plans: Vec<ResourcePlan>,
    /// One shared ledger per decryption scope, indexed by scope id.
    scope_ledgers: Vec<CapacityLedger>,
}

impl CandidatePlan {
    /// Creates an empty plan over the given resource set.
    pub fn new(set: &ResourceSet) -> Self {
        Self {
            resource_plans: set
                .resources()
                .iter()
                .enumerate()
                .map(|(i, r)| ResourcePlan::new(i, r))
                .collect(),
            scope_ledgers: set
                .scopes()
                .iter()
                .map(|s| CapacityLedger::new(s.limit))
                .collect(),
        }
    }

    /// Deep copy: every resource plan and every scope ledger.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Forks while discarding per-resource history before `pivot`.
    ///
    /// Decryption ledgers are copied without the pivot, so shared-scope
    /// commitments survive in full.
    pub fn restart(&self, pivot: DateTime<Utc>) -> Self {
        Self {
            resource_plans: self
                .resource_plans
                .iter()
                .map(|p| p.restart(pivot))
                .collect(),
            scope_ledgers: self.scope_ledgers.iter().map(|l| l.fork(None)).collect(),
        }
    }

    /// Attempts to place `window` for `event` on the resource at `index`.
    pub fn try_place(
        &mut self,
        set: &ResourceSet,
        index: usize,
        event: &RecurringEvent,
        window: &TimeWindow,
    ) -> bool {
        self.resource_plans[index].try_add(
            &set.resources()[index],
            set.scopes_of(index),
            event,
            window,
            &mut self.scope_ledgers,
        )
    }

    /// Charges a lost occurrence to the resource at `index`.
    pub fn record_cut(&mut self, index: usize, window: &TimeWindow) {
        self.resource_plans[index].record_cut(window);
    }

    /// Compares against another plan under a ranking strategy.
    ///
    /// Plans built over resource sets of different cardinality must never
    /// be compared; doing so is a programming error.
    pub fn rank(
        &self,
        other: &Self,
        strategy: &dyn RankingStrategy,
    ) -> Result<Ordering, SchedulerError> {
        if self.resource_plans.len() != other.resource_plans.len() {
            return Err(SchedulerError::inconsistency(format!(
                "ranking plans of different resource cardinality ({} vs {})",
                self.resource_plans.len(),
                other.resource_plans.len()
            )));
        }
        Ok(strategy.compare(self, other))
    }

    /// Per-resource plans, in priority order.
    pub fn resource_plans(&self) -> &[ResourcePlan] {
        &self.resource_plans
    }

    /// Shared decryption-scope ledgers, indexed by scope id.
    pub fn scope_ledgers(&self) -> &[CapacityLedger] {
        &self.scope_ledgers
    }

    /// Earliest booked start across all resources.
    pub fn earliest_start(&self) -> Option<DateTime<Utc>> {
        self.resource_plans
            .iter()
            .filter_map(|p| p.earliest_start())
            .min()
    }

    /// Latest booked end across all resources.
    pub fn latest_end(&self) -> Option<DateTime<Utc>> {
        self.resource_plans
            .iter()
            .filter_map(|p| p.latest_end())
            .max()
    }

    /// Flattens every booked interval into results, sorted by start
    /// ascending with ties broken by descending resource priority.
    pub fn collect_results(&self, set: &ResourceSet) -> Vec<ScheduleResult> {
        self.results_filtered(set, None)
    }

    /// Like [`collect_results`](Self::collect_results), restricted to
    /// bookings starting before `pivot`.
    pub fn results_before(&self, set: &ResourceSet, pivot: DateTime<Utc>) -> Vec<ScheduleResult> {
        self.results_filtered(set, Some(pivot))
    }

    fn results_filtered(
        &self,
        set: &ResourceSet,
        before: Option<DateTime<Utc>>,
    ) -> Vec<ScheduleResult> {
        let mut entries: Vec<(usize, &str, TimeWindow)> = Vec::new();
        for plan in &self.resource_plans {
            let index = plan.resource_index();
            for booking in plan.bookings() {
                if before.map_or(true, |p| booking.window.start < p) {
                    entries.push((index, &booking.event_id, booking.window));
                }
            }
        }
        entries.sort_by(|a, b| {
            a.2.start
                .cmp(&b.2.start)
                .then_with(|| {
                    let pa = set.resources()[a.0].priority;
                    let pb = set.resources()[b.0].priority;
                    pb.cmp(&pa)
                })
                .then_with(|| b.0.cmp(&a.0))
                .then_with(|| a.1.cmp(b.1))
        });
        entries
            .into_iter()
            .map(|(index, event_id, window)| {
                ScheduleResult::scheduled(event_id, set.resources()[index].name.clone(), window)
            })
            .collect()
    }
}
