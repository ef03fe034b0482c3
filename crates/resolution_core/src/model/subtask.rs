//! Subtask record.
//!
//! # Invariants
//! - `goal_id` never changes after creation.
//! - Per goal, `sort_order` values form `[0, n-1]` after every structural
//!   change completes; transient duplicates can exist between a racing
//!   append and the next structural change.

use crate::model::goal::GoalId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable subtask identifier (`subtasks.id`).
pub type SubtaskId = Uuid;

/// One checklist item as stored in the `subtasks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub goal_id: GoalId,
    pub text: String,
    pub is_complete: bool,
    pub sort_order: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// Insert payload. The repository assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubtask {
    pub goal_id: GoalId,
    pub text: String,
    pub sort_order: i64,
}

/// Partial update of one subtask row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskPatch {
    pub text: Option<String>,
    pub is_complete: Option<bool>,
    pub sort_order: Option<i64>,
}

impl SubtaskPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn completion(is_complete: bool) -> Self {
        Self {
            is_complete: Some(is_complete),
            ..Self::default()
        }
    }

    pub fn sort_order(sort_order: i64) -> Self {
        Self {
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, subtask: &mut Subtask) {
        if let Some(text) = &self.text {
            subtask.text = text.clone();
        }
        if let Some(is_complete) = self.is_complete {
            subtask.is_complete = is_complete;
        }
        if let Some(sort_order) = self.sort_order {
            subtask.sort_order = sort_order;
        }
    }
}
