//! Start/stop state machine for one goal timer.
//!
//! # Invariants
//! - `start` while running and `stop` while stopped are absorbed as no-ops.
//! - `stop` persists `total_time_seconds` and `timer_started_at = NULL` in one
//!   combined write.
//! - Cached state changes only after the repository write succeeds.

use crate::model::goal::{Goal, GoalId, GoalPatch, TimerPhase, TimerState};
use crate::repo::goal_repo::GoalRepository;
use crate::repo::RepoError;
use crate::timer::clock::Clock;
use crate::timer::elapsed::elapsed_seconds;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from timer transitions.
#[derive(Debug)]
pub enum TimerError {
    /// Goal row does not exist.
    GoalNotFound(GoalId),
    /// Persistence write or read failed; cached state is unchanged.
    Persistence(RepoError),
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::Persistence(err) => write!(f, "timer write failed: {err}"),
        }
    }
}

impl Error for TimerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            Self::GoalNotFound(_) => None,
        }
    }
}

impl From<RepoError> for TimerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::GoalNotFound(id) => Self::GoalNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTransition {
    /// Timer moved from stopped to running.
    Started { started_at: i64 },
    /// Timer moved from running to stopped.
    Stopped {
        total_time_seconds: u64,
        interval_seconds: u64,
    },
    /// Request was redundant for the current phase; nothing was written.
    Unchanged(TimerPhase),
}

/// Timer state machine for one goal.
pub struct TimerController<R: GoalRepository, C: Clock> {
    repo: R,
    clock: C,
    goal_id: GoalId,
    state: TimerState,
}

impl<R: GoalRepository, C: Clock> TimerController<R, C> {
    /// Creates a controller from already-loaded timer columns.
    pub fn new(repo: R, clock: C, goal_id: GoalId, state: TimerState) -> Self {
        Self {
            repo,
            clock,
            goal_id,
            state,
        }
    }

    /// Loads the goal row and derives the initial phase from it.
    pub fn load(repo: R, clock: C, goal_id: GoalId) -> Result<Self, TimerError> {
        let goal = repo
            .get_goal(goal_id)?
            .ok_or(TimerError::GoalNotFound(goal_id))?;
        Ok(Self::new(repo, clock, goal_id, goal.timer_state()))
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal_id
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> TimerPhase {
        self.state.phase()
    }

    /// Live elapsed seconds at the clock's current instant.
    pub fn elapsed_now(&self) -> u64 {
        elapsed_seconds(
            self.state.timer_started_at,
            self.state.total_time_seconds,
            self.clock.now_ms(),
        )
    }

    /// Opens a running interval at the current instant.
    ///
    /// Calling this while running keeps the existing interval.
    pub fn start(&mut self) -> Result<TimerTransition, TimerError> {
        if self.state.is_running() {
            debug!(
                "event=timer_start module=timer status=noop goal_id={}",
                self.goal_id
            );
            return Ok(TimerTransition::Unchanged(TimerPhase::Running));
        }

        let started_at = self.clock.now_ms();
        let patch = GoalPatch::start_timer(started_at);
        self.persist("timer_start", &patch)?;
        self.state.timer_started_at = Some(started_at);

        info!(
            "event=timer_start module=timer status=ok goal_id={} started_at={}",
            self.goal_id, started_at
        );
        Ok(TimerTransition::Started { started_at })
    }

    /// Closes the running interval and folds it into the accumulated total.
    ///
    /// Calling this while stopped does nothing.
    pub fn stop(&mut self) -> Result<TimerTransition, TimerError> {
        if !self.state.is_running() {
            debug!(
                "event=timer_stop module=timer status=noop goal_id={}",
                self.goal_id
            );
            return Ok(TimerTransition::Unchanged(TimerPhase::Stopped));
        }

        let total_time_seconds = self.elapsed_now();
        let interval_seconds = total_time_seconds.saturating_sub(self.state.total_time_seconds);
        let patch = GoalPatch::stop_timer(total_time_seconds);
        self.persist("timer_stop", &patch)?;
        self.state = TimerState {
            total_time_seconds,
            timer_started_at: None,
        };

        info!(
            "event=timer_stop module=timer status=ok goal_id={} interval_seconds={} total_seconds={}",
            self.goal_id, interval_seconds, total_time_seconds
        );
        Ok(TimerTransition::Stopped {
            total_time_seconds,
            interval_seconds,
        })
    }

    /// Starts a stopped timer or stops a running one.
    pub fn toggle(&mut self) -> Result<TimerTransition, TimerError> {
        match self.phase() {
            TimerPhase::Stopped => self.start(),
            TimerPhase::Running => self.stop(),
        }
    }

    /// Replaces cached timer columns with a freshly fetched row.
    ///
    /// Used after another session changed the timer; last write wins.
    pub fn adopt(&mut self, goal: &Goal) {
        if goal.id == self.goal_id {
            self.state = goal.timer_state();
        }
    }

    fn persist(&self, event: &'static str, patch: &GoalPatch) -> Result<(), TimerError> {
        self.repo.update_goal(self.goal_id, patch).map_err(|err| {
            error!(
                "event={} module=timer status=error goal_id={} error={}",
                event, self.goal_id, err
            );
            TimerError::from(err)
        })
    }
}
