//! The recording scheduler: a forward search over candidate plans.
//!
//! # Algorithm
//!
//! 1. **Merge**: select the next chronological occurrence across all live
//!    event cursors (min by start, ties by registration order).
//! 2. **Branch**: fork every frontier plan across the resources that
//!    accept the occurrence. A plan on which no resource accepts survives
//!    once, with the lost time charged as cut.
//! 3. **Prune**: when a bound is hit, collapse the frontier to the single
//!    best plan under the ranking strategy, emit its finished results,
//!    and reseed the search from the winner restarted at the new
//!    occurrence's start.
//! 4. **Drain**: once every cursor is exhausted, emit the final best
//!    plan's remaining results.
//!
//! The search is single-threaded, deterministic, and synchronous. It is
//! exposed as a lazy, forward-only sequence: consuming [`ScheduleIter`]
//! drives the search incrementally, and dropping it aborts the run.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::SchedulerError;
use crate::models::{
    DecryptionGroup, OccurrenceCursor, RecurringEvent, Resource, ResourceSet, TimeWindow,
};
use crate::plan::{CandidatePlan, ScheduleResult};
use crate::ranking::{select_best, DefaultRanking, RankingStrategy};

/// Search bounds, passed explicitly to the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Occurrences placed between prunes before the frontier collapses.
    pub max_recordings_in_plan: usize,
    /// Maximum number of live plan alternatives before the frontier
    /// collapses.
    pub max_alternatives_in_plan: usize,
    /// Maximum occupied span a frontier may cover before the frontier
    /// collapses.
    pub horizon: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recordings_in_plan: 30,
            max_alternatives_in_plan: 250,
            horizon: Duration::days(2),
        }
    }
}

/// Branch-and-bound scheduler over a resource set.
pub struct SchedulingEngine {
    set: ResourceSet,
    events: Vec<RecurringEvent>,
    config: EngineConfig,
    strategy: Arc<dyn RankingStrategy>,
}

impl SchedulingEngine {
    /// Creates an engine with an empty resource set, default bounds, and
    /// the default ranking strategy.
    pub fn new() -> Self {
        Self::with_resource_set(ResourceSet::new())
    }

    /// Creates an engine over a pre-built resource set.
    pub fn with_resource_set(set: ResourceSet) -> Self {
        Self {
            set,
            events: Vec::new(),
            config: EngineConfig::default(),
            strategy: Arc::new(DefaultRanking::new()),
        }
    }

    /// Sets the search bounds.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the ranking strategy.
    pub fn with_strategy<S: RankingStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Registers a resource. Fails on duplicates and negative limits.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), SchedulerError> {
        self.set.add_resource(resource)
    }

    /// Registers a decryption-group tree. Fails on duplicates, negative
    /// limits, and unknown member resources.
    pub fn add_group(&mut self, group: DecryptionGroup) -> Result<(), SchedulerError> {
        self.set.add_group(group)
    }

    /// Registers a recording request.
    pub fn add_event(&mut self, event: RecurringEvent) {
        self.events.push(event);
    }

    /// The registered resources and scopes.
    pub fn resource_set(&self) -> &ResourceSet {
        &self.set
    }

    /// Starts a scheduling run at `from`.
    ///
    /// Occurrences already finished at `from` are skipped; an occurrence
    /// in progress at `from` is still considered.
    pub fn run(&self, from: DateTime<Utc>) -> ScheduleIter<'_> {
        let cursors = self
            .events
            .iter()
            .map(|event| {
                let mut cursor = OccurrenceCursor::new(event);
                cursor.reset(from);
                cursor
            })
            .collect();
        ScheduleIter {
            engine: self,
            cursors,
            frontier: vec![CandidatePlan::new(&self.set)],
            steps_since_prune: 0,
            pending_failures: Vec::new(),
            queue: VecDeque::new(),
            done: false,
        }
    }
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, forward-only sequence of scheduling outcomes.
///
/// Non-restartable: once consumed, a new run must be started from the
/// engine. Dropping the iterator abandons the current frontier.
pub struct ScheduleIter<'a> {
    engine: &'a SchedulingEngine,
    cursors: Vec<OccurrenceCursor<'a>>,
    frontier: Vec<CandidatePlan>,
    steps_since_prune: usize,
    /// Failures held back until the dump that emits the surrounding
    /// successes; ascending by start since occurrences arrive in order.
    pending_failures: Vec<ScheduleResult>,
    queue: VecDeque<ScheduleResult>,
    done: bool,
}

impl Iterator for ScheduleIter<'_> {
    type Item = ScheduleResult;

    fn next(&mut self) -> Option<ScheduleResult> {
        loop {
            if let Some(result) = self.queue.pop_front() {
                return Some(result);
            }
            if self.done {
                return None;
            }
            self.step();
        }
    }
}

impl ScheduleIter<'_> {
    /// Runs one merge/branch cycle (with a prune when a bound is hit),
    /// or drains the search when every cursor is exhausted.
    fn step(&mut self) {
        let Some((cursor_index, window)) = self.next_occurrence() else {
            self.drain();
            return;
        };

        if self.should_prune(&window) {
            self.prune(window.start);
        }

        self.cursors[cursor_index].advance();
        let event = self.cursors[cursor_index].event();
        self.branch(event, &window);
        self.steps_since_prune += 1;
    }

    /// The cursor holding the earliest next occurrence, ties resolved by
    /// registration order.
    fn next_occurrence(&self) -> Option<(usize, TimeWindow)> {
        let mut selected: Option<(usize, TimeWindow)> = None;
        for (i, cursor) in self.cursors.iter().enumerate() {
            if let Some(window) = cursor.current() {
                if selected.map_or(true, |(_, best)| window.start < best.start) {
                    selected = Some((i, window));
                }
            }
        }
        selected
    }

    fn should_prune(&self, next: &TimeWindow) -> bool {
        if self.steps_since_prune >= self.engine.config.max_recordings_in_plan {
            return true;
        }
        if self.frontier.len() > self.engine.config.max_alternatives_in_plan {
            return true;
        }
        let latest = self.frontier.iter().filter_map(|p| p.latest_end()).max();
        if let Some(latest) = latest {
            // Nothing still running interacts with the new occurrence.
            if next.start >= latest {
                return true;
            }
        }
        let earliest = self.frontier.iter().filter_map(|p| p.earliest_start()).min();
        if let Some(earliest) = earliest {
            if next.start - earliest > self.engine.config.horizon {
                return true;
            }
        }
        false
    }

    /// Collapses the frontier to the best plan, emits its finished
    /// results, and reseeds the search restarted at `pivot`.
    fn prune(&mut self, pivot: DateTime<Utc>) {
        let strategy = self.engine.strategy.as_ref();
        let Some(best) = select_best(&self.frontier, strategy) else {
            return;
        };
        let winner = &self.frontier[best];
        let finished = winner.results_before(&self.engine.set, pivot);
        let reseeded = winner.restart(pivot);
        debug!(
            alternatives = self.frontier.len(),
            emitted = finished.len(),
            %pivot,
            "pruning frontier"
        );
        self.frontier = vec![reseeded];
        self.steps_since_prune = 0;
        self.emit_ordered(finished, Some(pivot));
    }

    /// Forks the frontier across resources for one occurrence.
    fn branch(&mut self, event: &RecurringEvent, window: &TimeWindow) {
        let set = &self.engine.set;
        let allowed: Vec<usize> = (0..set.len())
            .filter(|&i| event.allows_resource(&set.resources()[i].name))
            .collect();

        let mut children: Vec<CandidatePlan> = Vec::new();
        let mut rejected: Vec<CandidatePlan> = Vec::new();
        let mut placed_anywhere = false;

        for plan in &self.frontier {
            let mut placed_here = false;
            for &index in &allowed {
                let mut child = plan.fork();
                if child.try_place(set, index, event, window) {
                    children.push(child);
                    placed_here = true;
                }
            }
            if placed_here {
                placed_anywhere = true;
            } else {
                rejected.push(plan.fork());
            }
        }

        if !placed_anywhere {
            // The occurrence is lost; the frontier stays as it was. The
            // failure waits for the dump covering its start time so the
            // output stream stays ordered.
            debug!(event = %event.id, start = %window.start, "occurrence unplaceable");
            self.pending_failures
                .push(ScheduleResult::failure(event.id.clone(), *window));
            return;
        }

        // Plans that could not take the occurrence stay alive carrying
        // the cut, so the ranking can weigh lost time against placement.
        let charge = allowed.first().copied().unwrap_or(0);
        for mut plan in rejected {
            plan.record_cut(charge, window);
            children.push(plan);
        }

        trace!(
            event = %event.id,
            start = %window.start,
            alternatives = children.len(),
            "branched occurrence"
        );
        self.frontier = children;
    }

    /// Final pruning after all occurrences are consumed.
    fn drain(&mut self) {
        let strategy = self.engine.strategy.as_ref();
        let results = match select_best(&self.frontier, strategy) {
            Some(best) => self.frontier[best].collect_results(&self.engine.set),
            None => Vec::new(),
        };
        debug!(emitted = results.len(), "draining final plan");
        self.frontier.clear();
        self.done = true;
        self.emit_ordered(results, None);
    }

    /// Queues a dump: `scheduled` results merged with the pending
    /// failures whose start falls before `pivot` (all of them when
    /// `None`), by ascending start. A success and a failure sharing a
    /// start instant emit the success first.
    fn emit_ordered(&mut self, scheduled: Vec<ScheduleResult>, pivot: Option<DateTime<Utc>>) {
        let released: Vec<ScheduleResult> = match pivot {
            Some(p) => {
                let upto = self
                    .pending_failures
                    .partition_point(|r| r.window.start < p);
                self.pending_failures.drain(..upto).collect()
            }
            None => std::mem::take(&mut self.pending_failures),
        };

        let mut scheduled = scheduled.into_iter().peekable();
        let mut failed = released.into_iter().peekable();
        loop {
            let take_failed = match (scheduled.peek(), failed.peek()) {
                (Some(s), Some(f)) => f.window.start < s.window.start,
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => break,
            };
            let next = if take_failed {
                failed.next()
            } else {
                scheduled.next()
            };
            if let Some(result) = next {
                self.queue.push_back(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayException, RepeatMask, SourceRef};
    use chrono::{NaiveDate, TimeZone};

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
    }

    fn win(day: u32, from: (u32, u32), to: (u32, u32)) -> TimeWindow {
        TimeWindow::from_range(at(day, from.0, from.1), at(day, to.0, to.1))
    }

    fn one_shot(id: &str, source: &str, window: TimeWindow) -> RecurringEvent {
        RecurringEvent::new(id, SourceRef::clear(source), window)
    }

    fn run_all(engine: &SchedulingEngine) -> Vec<ScheduleResult> {
        engine.run(at(1, 0, 0)).collect()
    }

    #[test]
    fn test_single_event_single_resource() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1").with_source_limit(1)).unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));

        let results = run_all(&engine);
        assert_eq!(results.len(), 1);
        assert!(results[0].scheduled);
        assert_eq!(results[0].resource.as_deref(), Some("R1"));
        assert_eq!(results[0].window, win(2, (10, 0), (11, 0)));
    }

    #[test]
    fn test_capacity_exhaustion_emits_failure() {
        // Spec example: one resource, limit 1; two overlapping events.
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1").with_source_limit(1)).unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));
        engine.add_event(one_shot("E2", "Y", win(2, (10, 30), (11, 30))));

        let results = run_all(&engine);
        assert_eq!(results.len(), 2);

        // The earlier-starting success comes first even though the
        // failure was decided before the success left the frontier.
        assert_eq!(results[0].event_id, "E1");
        assert!(results[0].scheduled);
        assert_eq!(results[0].resource.as_deref(), Some("R1"));
        assert_eq!(results[1].event_id, "E2");
        assert!(!results[1].scheduled);
        assert!(results[1].resource.is_none());
    }

    #[test]
    fn test_mixed_outcomes_emitted_in_ascending_start_order() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1").with_source_limit(1)).unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));
        engine.add_event(one_shot("E2", "Y", win(2, (10, 30), (11, 30))));
        engine.add_event(one_shot("E3", "Z", win(3, (10, 0), (11, 0))));

        let results = run_all(&engine);
        let ids: Vec<_> = results.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2", "E3"]);
        assert!(!results[1].scheduled);
        assert!(results
            .windows(2)
            .all(|p| p[0].window.start <= p[1].window.start));
    }

    #[test]
    fn test_completeness_under_slack() {
        // N overlapping occurrences, N resources with one slot each.
        let mut engine = SchedulingEngine::new();
        for i in 0..4 {
            engine
                .add_resource(Resource::new(format!("R{i}")).with_source_limit(1))
                .unwrap();
        }
        for i in 0..4 {
            engine.add_event(one_shot(
                &format!("E{i}"),
                &format!("S{i}"),
                win(2, (10, i * 5), (11, i * 5)),
            ));
        }

        let results = run_all(&engine);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.scheduled));
    }

    #[test]
    fn test_determinism() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("A").with_priority(10).with_source_limit(1)).unwrap();
        engine.add_resource(Resource::new("B").with_priority(90).with_source_limit(1)).unwrap();
        for i in 0..6 {
            engine.add_event(one_shot(
                &format!("E{i}"),
                &format!("S{}", i % 3),
                win(2, (9 + i, 0), (10 + i, 30)),
            ));
        }

        let first = run_all(&engine);
        let second = run_all(&engine);
        assert_eq!(first, second);
    }

    #[test]
    fn test_priority_tie_break_on_emission() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("low").with_priority(10).with_source_limit(1)).unwrap();
        engine.add_resource(Resource::new("high").with_priority(90).with_source_limit(1)).unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));
        engine.add_event(one_shot("E2", "Y", win(2, (10, 0), (11, 0))));

        let results = run_all(&engine);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.scheduled));
        // Same start instant: the higher-priority resource is emitted first.
        assert_eq!(results[0].resource.as_deref(), Some("high"));
        assert_eq!(results[1].resource.as_deref(), Some("low"));
    }

    #[test]
    fn test_results_emitted_in_ascending_start_order() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1").with_source_limit(2)).unwrap();
        // Daily event over five days forces at least one prune cycle
        // (each day's occurrence starts after the previous one ended).
        let event = RecurringEvent::new(
            "E1",
            SourceRef::clear("X"),
            win(2, (20, 0), (21, 0)),
        )
        .with_repeat(RepeatMask::daily())
        .with_until(NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
        engine.add_event(event);

        let results = run_all(&engine);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.scheduled));
        assert!(results
            .windows(2)
            .all(|p| p[0].window.start < p[1].window.start));
    }

    #[test]
    fn test_allowed_resource_subset_respected() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1").with_source_limit(4)).unwrap();
        engine.add_resource(Resource::new("R2").with_source_limit(4)).unwrap();
        let event = one_shot("E1", "X", win(2, (10, 0), (11, 0)))
            .with_allowed_resources(vec!["R2".into()]);
        engine.add_event(event);

        let results = run_all(&engine);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource.as_deref(), Some("R2"));
    }

    #[test]
    fn test_incapable_resources_force_failure() {
        let mut engine = SchedulingEngine::new();
        engine
            .add_resource(Resource::new("R1").with_sources(["OTHER"]))
            .unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));

        let results = run_all(&engine);
        assert_eq!(results.len(), 1);
        assert!(!results[0].scheduled);
    }

    #[test]
    fn test_zero_occurrence_event_silently_skipped() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1")).unwrap();
        // Every day suppressed by an exception.
        let event = RecurringEvent::new(
            "E1",
            SourceRef::clear("X"),
            win(2, (10, 0), (11, 0)),
        )
        .with_repeat(RepeatMask::daily())
        .with_until(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
        .with_exception(
            DayException::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
                .with_duration_delta(Duration::hours(-2)),
        );
        engine.add_event(event);
        engine.add_event(one_shot("E2", "Y", win(3, (10, 0), (11, 0))));

        let results = run_all(&engine);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_id, "E2");
    }

    #[test]
    fn test_run_skips_already_finished_occurrences() {
        let mut engine = SchedulingEngine::new();
        engine.add_resource(Resource::new("R1")).unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));

        let results: Vec<_> = engine.run(at(2, 12, 0)).collect();
        assert!(results.is_empty());
    }

    #[test]
    fn test_decryption_scope_limits_across_resources() {
        // Two tuners share one decryption slot; two overlapping encrypted
        // recordings cannot both run.
        let mut engine = SchedulingEngine::new();
        engine
            .add_resource(Resource::new("R1").with_source_limit(2).with_decryption_limit(2))
            .unwrap();
        engine
            .add_resource(Resource::new("R2").with_source_limit(2).with_decryption_limit(2))
            .unwrap();
        engine
            .add_group(
                DecryptionGroup::new("CAM", 1)
                    .with_member("R1")
                    .with_member("R2"),
            )
            .unwrap();
        engine.add_event(RecurringEvent::new(
            "E1",
            SourceRef::encrypted("X"),
            win(2, (10, 0), (11, 0)),
        ));
        engine.add_event(RecurringEvent::new(
            "E2",
            SourceRef::encrypted("Y"),
            win(2, (10, 30), (11, 30)),
        ));

        let results = run_all(&engine);
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.scheduled).count(), 1);
        assert_eq!(results.iter().filter(|r| !r.scheduled).count(), 1);
    }

    #[test]
    fn test_clear_sources_unaffected_by_decryption_group() {
        let mut engine = SchedulingEngine::new();
        engine
            .add_resource(Resource::new("R1").with_source_limit(2))
            .unwrap();
        engine
            .add_group(DecryptionGroup::new("CAM", 0).with_member("R1"))
            .unwrap();
        engine.add_event(one_shot("E1", "X", win(2, (10, 0), (11, 0))));
        engine.add_event(one_shot("E2", "Y", win(2, (10, 30), (11, 30))));

        let results = run_all(&engine);
        assert!(results.iter().all(|r| r.scheduled));
    }

    #[test]
    fn test_frontier_cap_forces_prune_and_search_survives() {
        let mut config = EngineConfig::default();
        config.max_alternatives_in_plan = 2;
        config.max_recordings_in_plan = 3;

        let mut engine = SchedulingEngine::new().with_config(config);
        for name in ["A", "B", "C"] {
            engine
                .add_resource(Resource::new(name).with_source_limit(1))
                .unwrap();
        }
        for i in 0..9u32 {
            engine.add_event(one_shot(
                &format!("E{i}"),
                &format!("S{i}"),
                win(2, (9 + i, 0), (9 + i, 40)),
            ));
        }

        let results = run_all(&engine);
        assert_eq!(results.len(), 9);
        assert!(results.iter().all(|r| r.scheduled));
        assert!(results
            .windows(2)
            .all(|p| p[0].window.start <= p[1].window.start));
    }

    #[test]
    fn test_total_cut_minimized_across_prunes() {
        // One single-slot resource, restricted events colliding pairwise:
        // the surviving plan after each prune must be one that lost the
        // least recording time.
        let mut config = EngineConfig::default();
        config.max_recordings_in_plan = 2;

        let mut engine = SchedulingEngine::new().with_config(config);
        engine.add_resource(Resource::new("R1").with_source_limit(1)).unwrap();
        engine.add_resource(Resource::new("R2").with_source_limit(1)).unwrap();
        // Three overlapping events: two fit (one per resource), one lost.
        engine.add_event(one_shot("E1", "A", win(2, (10, 0), (12, 0))));
        engine.add_event(one_shot("E2", "B", win(2, (10, 15), (11, 45))));
        engine.add_event(one_shot("E3", "C", win(2, (10, 30), (11, 0))));

        let results = run_all(&engine);
        let scheduled: Vec<_> = results.iter().filter(|r| r.scheduled).collect();
        let failed: Vec<_> = results.iter().filter(|r| !r.scheduled).collect();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].event_id, "E3");
    }

    #[test]
    fn test_empty_engine_yields_nothing() {
        let engine = SchedulingEngine::new();
        let results = run_all(&engine);
        assert!(results.is_empty());
    }
}
