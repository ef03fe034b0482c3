//! Cross-goal read models: completion progress and the goal board.
//!
//! # Invariants
//! - Progress is recomputed from `is_complete` flags on every read and is
//!   never stored.
//! - The denominator is the fixed goal count, not the number of rows read.

use crate::model::goal::{Goal, GoalId, TimerPhase, GOAL_COUNT};
use crate::repo::goal_repo::GoalRepository;
use crate::repo::RepoResult;
use crate::timer::clock::Clock;
use crate::timer::elapsed::elapsed_seconds;
use serde::Serialize;

/// Completed goals out of the fixed goal count.
///
/// `percent` is derived from the counts at construction and serialized with
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Completion percentage rounded to the nearest integer.
    pub percent: u32,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            completed,
            total,
            percent,
        }
    }

    pub fn from_goals(goals: &[Goal]) -> Self {
        Self::new(
            goals.iter().filter(|goal| goal.is_complete).count(),
            GOAL_COUNT,
        )
    }

    /// Completion ratio in `[0, 1]` for the fixed goal count.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// One goal row with its live elapsed time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalSummary {
    pub id: GoalId,
    pub title: String,
    pub is_complete: bool,
    pub timer_phase: TimerPhase,
    pub elapsed_seconds: u64,
}

/// Snapshot of every goal plus overall progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub goals: Vec<GoalSummary>,
    pub progress: Progress,
}

impl Board {
    /// Reads all goals and computes elapsed times at the clock's instant.
    pub fn load<R: GoalRepository, C: Clock>(repo: &R, clock: &C) -> RepoResult<Self> {
        let goals = repo.list_goals()?;
        let now_ms = clock.now_ms();
        let summaries = goals
            .iter()
            .map(|goal| GoalSummary {
                id: goal.id,
                title: goal.title.clone(),
                is_complete: goal.is_complete,
                timer_phase: goal.timer_state().phase(),
                elapsed_seconds: elapsed_seconds(
                    goal.timer_started_at,
                    goal.total_time_seconds,
                    now_ms,
                ),
            })
            .collect();
        Ok(Self {
            goals: summaries,
            progress: Progress::from_goals(&goals),
        })
    }
}
