//! Plan ranking: pluggable total-order comparators over candidate plans.
//!
//! A [`RankingStrategy`] is a pure pairwise ordering; strategies compose
//! over the search frontier via a tournament that keeps the running best
//! plan and replaces it whenever a challenger ranks strictly ahead.
//!
//! # Ordering Convention
//! `compare(a, b) == Ordering::Less` means `a` ranks ahead of `b` (is the
//! better plan). This mirrors the dispatching-rule convention of lower
//! score = scheduled first.

pub mod rulefile;
pub mod strategies;

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use crate::plan::CandidatePlan;

pub use rulefile::{RuleSet, StartOrderRules};
pub use strategies::{DuplicateSourceTime, ResourceCount, TotalCut};

/// A total-order comparator over candidate plan pairs.
///
/// Implementations must be pure: two plans always compare the same way
/// regardless of evaluation order, and `compare(a, b)` must be the
/// reverse of `compare(b, a)`.
pub trait RankingStrategy: Send + Sync + Debug {
    /// Strategy name (e.g. "TotalCut").
    fn name(&self) -> &'static str;

    /// Compares two plans; `Less` means `a` ranks ahead.
    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering;
}

/// Tournament selection: index of the best plan under a strategy.
///
/// The running best is replaced only when a challenger ranks strictly
/// ahead, so ties resolve to the earliest plan — which keeps selection
/// deterministic for a deterministic frontier order.
pub fn select_best(plans: &[CandidatePlan], strategy: &dyn RankingStrategy) -> Option<usize> {
    if plans.is_empty() {
        return None;
    }
    let mut best = 0;
    for (i, plan) in plans.iter().enumerate().skip(1) {
        if strategy.compare(plan, &plans[best]) == Ordering::Less {
            best = i;
        }
    }
    Some(best)
}

/// The default composite strategy.
///
/// Applies start-order rule violations first when a rule set is
/// configured, then falls back to a fixed chain: total cut, duplicate
/// source time, resource count. The first non-equal comparison wins.
#[derive(Debug, Clone)]
pub struct DefaultRanking {
    rules: Option<StartOrderRules>,
    chain: Vec<Arc<dyn RankingStrategy>>,
}

impl DefaultRanking {
    /// Creates the default chain without rule-file precedence.
    pub fn new() -> Self {
        Self {
            rules: None,
            chain: vec![
                Arc::new(TotalCut),
                Arc::new(DuplicateSourceTime),
                Arc::new(ResourceCount),
            ],
        }
    }

    /// Adds rule-file precedence ahead of the fixed chain.
    pub fn with_rules(mut self, rules: StartOrderRules) -> Self {
        self.rules = Some(rules);
        self
    }
}

impl Default for DefaultRanking {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingStrategy for DefaultRanking {
    fn name(&self) -> &'static str {
        "Default"
    }

    fn compare(&self, a: &CandidatePlan, b: &CandidatePlan) -> Ordering {
        if let Some(rules) = &self.rules {
            let by_rules = rules.compare(a, b);
            if by_rules != Ordering::Equal {
                return by_rules;
            }
        }
        for strategy in &self.chain {
            let ordering = strategy.compare(a, b);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
