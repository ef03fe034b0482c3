//! Goal record and timer state.
//!
//! # Invariants
//! - `timer_started_at == None` means the timer is stopped.
//! - `total_time_seconds` only changes on a stop transition or an explicit
//!   field edit.

use serde::{Deserialize, Serialize};

/// Stable goal identifier (`goals.id`).
pub type GoalId = i64;

/// Number of seeded goals. Completion progress is always measured against it.
pub const GOAL_COUNT: usize = 10;

/// One tracked goal ("weekend") as stored in the `goals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub description: Option<String>,
    pub is_complete: bool,
    pub notes: Option<String>,
    /// Accumulated seconds from all closed running intervals.
    pub total_time_seconds: u64,
    /// Epoch ms at which the current running interval began.
    pub timer_started_at: Option<i64>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Goal {
    /// Returns the timer columns of this goal.
    pub fn timer_state(&self) -> TimerState {
        TimerState {
            total_time_seconds: self.total_time_seconds,
            timer_started_at: self.timer_started_at,
        }
    }
}

/// The two timer phases. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Stopped,
    Running,
}

/// Timer columns of a goal, cached by the timer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub total_time_seconds: u64,
    pub timer_started_at: Option<i64>,
}

impl TimerState {
    pub fn phase(&self) -> TimerPhase {
        if self.timer_started_at.is_some() {
            TimerPhase::Running
        } else {
            TimerPhase::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase() == TimerPhase::Running
    }
}

/// Partial update of one goal row.
///
/// `None` leaves a column untouched. Nullable columns use a nested option:
/// `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub is_complete: Option<bool>,
    pub total_time_seconds: Option<u64>,
    pub timer_started_at: Option<Option<i64>>,
}

impl GoalPatch {
    /// Patch that opens a running interval at `started_at`.
    pub fn start_timer(started_at: i64) -> Self {
        Self {
            timer_started_at: Some(Some(started_at)),
            ..Self::default()
        }
    }

    /// Patch that closes the running interval.
    ///
    /// Both timer columns travel in the same write so the elapsed time can
    /// never be dropped by clearing the timestamp alone.
    pub fn stop_timer(total_time_seconds: u64) -> Self {
        Self {
            total_time_seconds: Some(total_time_seconds),
            timer_started_at: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the patch to a cached copy after the write succeeded.
    pub fn apply_to(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title = title.clone();
        }
        if let Some(description) = &self.description {
            goal.description = description.clone();
        }
        if let Some(notes) = &self.notes {
            goal.notes = notes.clone();
        }
        if let Some(is_complete) = self.is_complete {
            goal.is_complete = is_complete;
        }
        if let Some(total) = self.total_time_seconds {
            goal.total_time_seconds = total;
        }
        if let Some(started_at) = self.timer_started_at {
            goal.timer_started_at = started_at;
        }
    }
}
