//! Scheduler error types.
//!
//! Only two failure categories cross the public API:
//!
//! - [`SchedulerError::Configuration`] — raised synchronously at
//!   registration time (duplicate resource, negative limit, malformed
//!   decryption group). Never recovered internally; the caller fixes the
//!   configuration and registers again.
//! - [`SchedulerError::InternalInconsistency`] — a programming-error
//!   signal (e.g. comparing plans built over different resource sets).
//!
//! An occurrence that cannot be placed on any resource is **not** an
//! error: it is reported as a failed [`crate::plan::ScheduleResult`] and
//! the search continues.

use thiserror::Error;

/// Errors produced by resource registration and plan ranking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Invalid configuration detected at registration time.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What was wrong with the registered resource or group.
        reason: String,
    },

    /// Internal invariant broken; indicates a bug in the caller or engine.
    #[error("internal inconsistency: {reason}")]
    InternalInconsistency {
        /// Which invariant was violated.
        reason: String,
    },
}

impl SchedulerError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistency(reason: impl Into<String>) -> Self {
        Self::InternalInconsistency {
            reason: reason.into(),
        }
    }
}
