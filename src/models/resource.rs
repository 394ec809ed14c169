//! Resource (device) model.
//!
//! A resource is one tuner-like device: a name, a scheduling priority,
//! capacity limits for parallel and parallel-decrypted sources, and a
//! capability filter deciding which sources it can receive.
//!
//! Priority and limits are immutable for the engine's lifetime. The
//! capability test may be answered from a memo cache that is invalidated
//! by bumping a generation counter, so a collaborator can refresh device
//! capability data between scheduling runs without rebuilding resources.

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::SourceRef;

/// Default maximum number of simultaneously received sources.
pub const DEFAULT_SOURCE_LIMIT: i32 = 15;
/// Default maximum number of simultaneously decrypted sources.
pub const DEFAULT_DECRYPTION_LIMIT: i32 = 1;
/// Default device priority.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Settings key for the per-device source limit.
pub const SOURCE_LIMIT_KEY: &str = "Scheduler.SourceLimit";
/// Settings key for the per-device decryption limit.
pub const DECRYPTION_LIMIT_KEY: &str = "Scheduler.DecryptionLimit";
/// Settings key for the device priority.
pub const PRIORITY_KEY: &str = "Scheduler.Priority";

/// Which sources a resource can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFilter {
    /// The resource can receive any source.
    Any,
    /// The resource can receive only the listed source ids.
    Allow(HashSet<String>),
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::Any
    }
}

/// One tuner-like device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique device name.
    pub name: String,
    /// Scheduling priority. Higher values win ties when results are
    /// emitted; the resource list is kept in ascending priority order.
    pub priority: i32,
    /// Maximum number of sources received in parallel.
    pub source_limit: i32,
    /// Maximum number of decrypted sources received in parallel.
    pub decryption_limit: i32,
    /// Capability filter for source reception.
    pub filter: SourceFilter,
    #[serde(skip)]
    access_cache: RefCell<HashMap<String, (u64, bool)>>,
    #[serde(skip)]
    generation: Cell<u64>,
}

impl Resource {
    /// Creates a resource with default limits and priority.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            source_limit: DEFAULT_SOURCE_LIMIT,
            decryption_limit: DEFAULT_DECRYPTION_LIMIT,
            filter: SourceFilter::Any,
            access_cache: RefCell::new(HashMap::new()),
            generation: Cell::new(0),
        }
    }

    /// Creates a resource from collaborator-supplied settings.
    ///
    /// Reads `Scheduler.SourceLimit`, `Scheduler.DecryptionLimit` and
    /// `Scheduler.Priority`; a missing or malformed value falls back to
    /// its default.
    pub fn from_settings(name: impl Into<String>, settings: &HashMap<String, String>) -> Self {
        let read = |key: &str, default: i32| -> i32 {
            settings
                .get(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or(default)
        };
        Self {
            name: name.into(),
            priority: read(PRIORITY_KEY, DEFAULT_PRIORITY),
            source_limit: read(SOURCE_LIMIT_KEY, DEFAULT_SOURCE_LIMIT),
            decryption_limit: read(DECRYPTION_LIMIT_KEY, DEFAULT_DECRYPTION_LIMIT),
            filter: SourceFilter::Any,
            access_cache: RefCell::new(HashMap::new()),
            generation: Cell::new(0),
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the parallel-source limit.
    pub fn with_source_limit(mut self, limit: i32) -> Self {
        self.source_limit = limit;
        self
    }

    /// Sets the parallel-decryption limit.
    pub fn with_decryption_limit(mut self, limit: i32) -> Self {
        self.decryption_limit = limit;
        self
    }

    /// Restricts reception to an explicit source id list.
    pub fn with_sources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = SourceFilter::Allow(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Whether this device can receive the given source.
    ///
    /// The answer is memoized per source id; `invalidate_access_cache`
    /// discards all memoized answers.
    pub fn test_access(&self, source: &SourceRef) -> bool {
        let generation = self.generation.get();
        if let Some(&(cached_gen, answer)) = self.access_cache.borrow().get(&source.id) {
            if cached_gen == generation {
                return answer;
            }
        }
        let answer = match &self.filter {
            SourceFilter::Any => true,
            SourceFilter::Allow(ids) => ids.contains(&source.id),
        };
        self.access_cache
            .borrow_mut()
            .insert(source.id.clone(), (generation, answer));
        answer
    }

    /// Invalidates all memoized capability answers.
    pub fn invalidate_access_cache(&self) {
        self.generation.set(self.generation.get() + 1);
    }
}
