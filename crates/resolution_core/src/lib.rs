//! Core domain logic for the Resolution Tracker.
//!
//! Ten fixed goals each carry a work timer and an ordered subtask checklist.
//! This crate owns the two pieces of state logic around them: elapsed-time
//! accounting and ordered-list reconciliation against a row-level store
//! without multi-row transactions.

pub mod db;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;
pub mod timer;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::goal::{Goal, GoalId, GoalPatch, TimerPhase, TimerState, GOAL_COUNT};
pub use model::subtask::{NewSubtask, Subtask, SubtaskId, SubtaskPatch};
pub use ordering::reconciler::{
    reconcile, ListOp, MoveTarget, OrdinalChange, RankedItem, ReconcileError, Reconciliation,
};
pub use repo::goal_repo::{GoalRepository, SqliteGoalRepository};
pub use repo::subtask_repo::{SqliteSubtaskRepository, SubtaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::board::{Board, GoalSummary, Progress};
pub use service::goal_aggregate::{GoalAggregate, GoalDetailsEdit, GoalError, GoalView};
pub use service::subtask_sync::{ConsistencyDrift, SubtaskSyncController, SyncError};
pub use timer::clock::{Clock, ManualClock, SystemClock};
pub use timer::controller::{TimerController, TimerError, TimerTransition};
pub use timer::elapsed::{elapsed_seconds, format_duration};
pub use timer::ticker::{DisplayTicker, TickControl, DISPLAY_TICK};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
