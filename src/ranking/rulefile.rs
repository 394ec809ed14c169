//! Start-order rule file: a textual mini-language for device precedence.
//!
//! A rule set is a `|`-separated list of rules. Each rule names a leading
//! resource, optionally followed by `<`-joined resource names:
//!
//! ```text
//! CardA<CardB<CardC|CardD<*
//! ```
//!
//! reads "CardB and CardC must not start while CardA is already running,
//! and no other resource may start while CardD is running" (`*` as a
//! trailing token applies the rule to all other resources).
//!
//! [`StartOrderRules`] compiles a parsed [`RuleSet`] against a resource
//! set and ranks plans by violation count: each occasion where a listed
//! resource starts while the leading resource is already running scores
//! one violation, and fewer violations ranks ahead.

use std::cmp::Ordering;

use crate::models::ResourceSet;
use crate::plan::CandidatePlan;

use super::RankingStrategy;

/// One parsed precedence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The resource that must not already be running.
    pub leading: String,
    /// Resources whose start is checked against the leading resource.
    pub watched: Vec<String>,
    /// Whether the rule applies to all other resources (`*`).
    pub all: bool,
}

/// A parsed rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Parses rule text.
    ///
    /// Tolerant by design: empty rules, empty tokens, and surrounding
    /// whitespace are skipped rather than rejected, since the text comes
    /// from hand-edited configuration.
    pub fn parse(text: &str) -> Self {
        let mut rules = Vec::new();
        for part in text.split('|') {
            let mut tokens = part.split('<').map(str::trim).filter(|t| !t.is_empty());
            let Some(leading) = tokens.next() else {
                continue;
            };
            let mut watched = Vec::new();
            let mut all = false;
            for token in tokens {
                if token == "*" {
                    all = true;
                } else {
                    watched.push(token.to_string());
                }
            }
            rules.push(Rule {
                leading: leading.to_string(),
                watched,
                all,
            });
        }
        Self { rules }
    }

    /// The parsed rules, in file order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A compiled rule: resource indices instead of names.
#[derive(Debug, Clone)]
struct CompiledRule {
    leading: usize,
    watched: Vec<usize>,
}

/// Rule-file-driven ranking strategy.
///
/// Rules naming unknown resources are dropped at compile time; an
/// unknown watched name is skipped while the rest of its rule stays
/// effective.
#[derive(Debug, Clone)]
pub struct StartOrderRules {
    compiled: Vec<CompiledRule>,
}

impl StartOrderRules {
    /// Compiles a rule set against the registered resources.
    pub fn compile(rules: &RuleSet, set: &ResourceSet) -> Self {
        let mut compiled = Vec::new();
        for rule in rules.rules() {
            let Some(leading) = set.index_of(&rule.leading) else {
                continue;
            };
            let mut watched: Vec<usize> = if rule.all {
                (0..set.len()).filter(|&i| i != leading).collect()
            } else {
                rule.watched
                    .iter()
                    .filter_map(|name| set.index_of(name))
                    .filter(|&i| i != leading)
                    .collect()
            };
            watched.sort_unstable();
            watched.dedup();
            compiled.push(CompiledRule { leading, watched });
        }
        Self { compiled }
    }

    /// Convenience: parse and compile in one step.
    pub fn from_text(text: &str, set: &ResourceSet) -> Self {
        Self::compile(&RuleSet::parse(text), set)
    }

    /// Number of rule violations in a plan.
    ///
    /// One violation per occasion a watched resource starts while the
    /// leading resource is already running (the start instant itself does
    /// not count as running).
    pub fn violations(&self, plan: &CandidatePlan) -> u32 {
        let mut count = 0;
        for rule in &self.compiled {
            let leading = &plan.resource_plans()[rule.leading];
            for &watched in &rule.watched {
                for &start in plan.resource_plans()[watched].activations() {
                    if leading.running_at(start) {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

impl RankingStrategy for StartOrderRules {
    fn name(&self) -> &'static str {
        "StartOrderRules"
    }

    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering {
        self.violations(a).cmp(&self.violations(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecurringEvent, Resource, SourceRef, TimeWindow};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    fn win(from: (u32, u32), to: (u32, u32)) -> TimeWindow {
        TimeWindow::from_range(at(from.0, from.1), at(to.0, to.1))
    }

    fn event(id: &str) -> RecurringEvent {
        RecurringEvent::new(id, SourceRef::clear("SRC"), win((10, 0), (11, 0)))
    }

    fn three_resources() -> ResourceSet {
        let mut set = ResourceSet::new();
        for name in ["A", "B", "C"] {
            set.add_resource(Resource::new(name).with_source_limit(4)).unwrap();
        }
        set
    }

    #[test]
    fn test_parse_chained_rule() {
        let rules = RuleSet::parse("A<B<C");
        assert_eq!(rules.rules().len(), 1);
        let rule = &rules.rules()[0];
        assert_eq!(rule.leading, "A");
        assert_eq!(rule.watched, vec!["B", "C"]);
        assert!(!rule.all);
    }

    #[test]
    fn test_parse_multiple_rules_and_star() {
        let rules = RuleSet::parse("A<B|D<*");
        assert_eq!(rules.rules().len(), 2);
        assert_eq!(rules.rules()[1].leading, "D");
        assert!(rules.rules()[1].all);
        assert!(rules.rules()[1].watched.is_empty());
    }

    #[test]
    fn test_parse_skips_empty_parts() {
        let rules = RuleSet::parse(" | A < B | | ");
        assert_eq!(rules.rules().len(), 1);
        assert_eq!(rules.rules()[0].leading, "A");
        assert_eq!(rules.rules()[0].watched, vec!["B"]);
    }

    #[test]
    fn test_parse_leading_only_rule() {
        let rules = RuleSet::parse("A");
        assert_eq!(rules.rules().len(), 1);
        assert!(rules.rules()[0].watched.is_empty());
        assert!(!rules.rules()[0].all);
    }

    #[test]
    fn test_violation_counted_once_per_start() {
        let set = three_resources();
        let rules = StartOrderRules::from_text("A<B", &set);

        // B starts at 10:30 while A runs 10:00-11:00.
        let mut violating = CandidatePlan::new(&set);
        assert!(violating.try_place(&set, 0, &event("E1"), &win((10, 0), (11, 0))));
        assert!(violating.try_place(&set, 1, &event("E2"), &win((10, 30), (11, 30))));
        assert_eq!(rules.violations(&violating), 1);

        // Same bookings, but B starts after A stops.
        let mut clean = CandidatePlan::new(&set);
        assert!(clean.try_place(&set, 0, &event("E1"), &win((10, 0), (11, 0))));
        assert!(clean.try_place(&set, 1, &event("E2"), &win((11, 0), (12, 0))));
        assert_eq!(rules.violations(&clean), 0);

        assert_eq!(rules.compare(&clean, &violating), Ordering::Less);
    }

    #[test]
    fn test_reverse_direction_not_a_violation() {
        let set = three_resources();
        let rules = StartOrderRules::from_text("A<B", &set);

        // A starts while B is running: the rule only watches B's starts.
        let mut plan = CandidatePlan::new(&set);
        assert!(plan.try_place(&set, 1, &event("E1"), &win((10, 0), (11, 0))));
        assert!(plan.try_place(&set, 0, &event("E2"), &win((10, 30), (11, 30))));
        assert_eq!(rules.violations(&plan), 0);
    }

    #[test]
    fn test_star_watches_all_other_resources() {
        let set = three_resources();
        let rules = StartOrderRules::from_text("A<*", &set);

        let mut plan = CandidatePlan::new(&set);
        assert!(plan.try_place(&set, 0, &event("E1"), &win((10, 0), (12, 0))));
        assert!(plan.try_place(&set, 1, &event("E2"), &win((10, 30), (11, 0))));
        assert!(plan.try_place(&set, 2, &event("E3"), &win((11, 0), (11, 30))));
        assert_eq!(rules.violations(&plan), 2);
    }

    #[test]
    fn test_unknown_names_dropped_at_compile() {
        let set = three_resources();
        let rules = StartOrderRules::from_text("ghost<A|A<phantom<B", &set);

        // First rule dropped entirely; second keeps only B.
        let mut plan = CandidatePlan::new(&set);
        assert!(plan.try_place(&set, 0, &event("E1"), &win((10, 0), (11, 0))));
        assert!(plan.try_place(&set, 1, &event("E2"), &win((10, 30), (11, 30))));
        assert_eq!(rules.violations(&plan), 1);
    }
}
