//! Goal aggregate: one goal, its timer and its checklist.
//!
//! # Responsibility
//! - Compose `TimerController` and `SubtaskSyncController` for one goal.
//! - Own field edits of the goal row (title, description, notes,
//!   completion flag).
//! - Produce the combined read view with a freshly computed elapsed time.
//!
//! # Invariants
//! - Timer columns in the view always come from the timer controller.
//! - `is_complete` is set explicitly; it is never derived from subtasks.

use crate::model::goal::{Goal, GoalId, GoalPatch, TimerPhase};
use crate::model::subtask::Subtask;
use crate::repo::goal_repo::GoalRepository;
use crate::repo::subtask_repo::SubtaskRepository;
use crate::repo::RepoError;
use crate::service::subtask_sync::{ConsistencyDrift, SubtaskSyncController, SyncError};
use crate::timer::clock::Clock;
use crate::timer::controller::{TimerController, TimerError, TimerTransition};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from goal aggregate operations.
#[derive(Debug)]
pub enum GoalError {
    /// Goal row does not exist.
    GoalNotFound(GoalId),
    /// Title is blank after trim.
    InvalidTitle,
    /// Timer transition failed.
    Timer(TimerError),
    /// Checklist operation failed.
    Sync(SyncError),
    /// Goal row read or write failed.
    Repo(RepoError),
}

impl Display for GoalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GoalNotFound(id) => write!(f, "goal not found: {id}"),
            Self::InvalidTitle => write!(f, "goal title must not be blank"),
            Self::Timer(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GoalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TimerError> for GoalError {
    fn from(value: TimerError) -> Self {
        match value {
            TimerError::GoalNotFound(id) => Self::GoalNotFound(id),
            other => Self::Timer(other),
        }
    }
}

impl From<SyncError> for GoalError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<RepoError> for GoalError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::GoalNotFound(id) => Self::GoalNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Edit of the free-text goal fields.
///
/// `None` leaves a field untouched. Every field is stored trimmed. Blank
/// description or notes are stored as NULL; a blank title is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalDetailsEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Combined read model for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalView {
    pub goal: Goal,
    pub timer_phase: TimerPhase,
    /// Elapsed seconds at the moment the view was built.
    pub elapsed_seconds: u64,
    pub subtasks: Vec<Subtask>,
    pub completed_subtasks: usize,
    /// Set after a failed checklist write until the next refresh.
    pub needs_refresh: bool,
}

/// Composition root for one goal.
pub struct GoalAggregate<G, S, C>
where
    G: GoalRepository + Clone,
    S: SubtaskRepository,
    C: Clock,
{
    goal: Goal,
    goals: G,
    timer: TimerController<G, C>,
    subtasks: SubtaskSyncController<S>,
}

impl<G, S, C> GoalAggregate<G, S, C>
where
    G: GoalRepository + Clone,
    S: SubtaskRepository,
    C: Clock,
{
    /// Loads the goal row and its subtasks.
    pub fn load(goals: G, subtasks: S, clock: C, goal_id: GoalId) -> Result<Self, GoalError> {
        let goal = goals
            .get_goal(goal_id)?
            .ok_or(GoalError::GoalNotFound(goal_id))?;
        let timer = TimerController::new(goals.clone(), clock, goal_id, goal.timer_state());
        let subtasks = SubtaskSyncController::load(subtasks, goal_id)?;
        Ok(Self {
            goal,
            goals,
            timer,
            subtasks,
        })
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal.id
    }

    /// Builds the read view, recomputing elapsed time now.
    pub fn view(&self) -> GoalView {
        let timer_state = self.timer.state();
        let mut goal = self.goal.clone();
        goal.total_time_seconds = timer_state.total_time_seconds;
        goal.timer_started_at = timer_state.timer_started_at;

        let subtasks = self.subtasks.items().to_vec();
        let completed_subtasks = subtasks.iter().filter(|item| item.is_complete).count();
        GoalView {
            goal,
            timer_phase: timer_state.phase(),
            elapsed_seconds: self.timer.elapsed_now(),
            subtasks,
            completed_subtasks,
            needs_refresh: self.subtasks.needs_refresh(),
        }
    }

    pub fn timer(&self) -> &TimerController<G, C> {
        &self.timer
    }

    pub fn start_timer(&mut self) -> Result<TimerTransition, GoalError> {
        Ok(self.timer.start()?)
    }

    pub fn stop_timer(&mut self) -> Result<TimerTransition, GoalError> {
        Ok(self.timer.stop()?)
    }

    pub fn toggle_timer(&mut self) -> Result<TimerTransition, GoalError> {
        Ok(self.timer.toggle()?)
    }

    pub fn subtasks(&self) -> &SubtaskSyncController<S> {
        &self.subtasks
    }

    pub fn subtasks_mut(&mut self) -> &mut SubtaskSyncController<S> {
        &mut self.subtasks
    }

    /// Writes title/description/notes edits in one row update.
    pub fn update_details(&mut self, edit: GoalDetailsEdit) -> Result<(), GoalError> {
        let patch = GoalPatch {
            title: edit.title.map(normalize_title).transpose()?,
            description: edit.description.map(blank_to_none),
            notes: edit.notes.map(blank_to_none),
            ..GoalPatch::default()
        };
        if patch.is_empty() {
            return Ok(());
        }
        self.write_patch("goal_update_details", patch)
    }

    /// Sets the completion flag.
    pub fn set_complete(&mut self, is_complete: bool) -> Result<(), GoalError> {
        if self.goal.is_complete == is_complete {
            return Ok(());
        }
        self.write_patch(
            "goal_set_complete",
            GoalPatch {
                is_complete: Some(is_complete),
                ..GoalPatch::default()
            },
        )
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_complete(&mut self) -> Result<bool, GoalError> {
        let next = !self.goal.is_complete;
        self.set_complete(next)?;
        Ok(next)
    }

    /// Refetches the goal row and subtask list, adopting both.
    ///
    /// Returns checklist drift observed during the refetch.
    pub fn refresh(&mut self) -> Result<Option<ConsistencyDrift>, GoalError> {
        let goal_id = self.goal.id;
        let goal = self
            .goals
            .get_goal(goal_id)?
            .ok_or(GoalError::GoalNotFound(goal_id))?;
        self.timer.adopt(&goal);
        self.goal = goal;
        Ok(self.subtasks.refresh()?)
    }

    fn write_patch(&mut self, event: &'static str, patch: GoalPatch) -> Result<(), GoalError> {
        if let Err(err) = self.goals.update_goal(self.goal.id, &patch) {
            error!(
                "event={} module=goal status=error goal_id={} error={}",
                event, self.goal.id, err
            );
            return Err(err.into());
        }
        patch.apply_to(&mut self.goal);
        info!(
            "event={} module=goal status=ok goal_id={}",
            event, self.goal.id
        );
        Ok(())
    }
}

fn normalize_title(value: String) -> Result<String, GoalError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GoalError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
