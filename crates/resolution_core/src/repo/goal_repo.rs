//! Goal repository contract and SQLite implementation.
//!
//! # Invariants
//! - Goals are listed in `id ASC` order.
//! - `update_goal` writes every patched column in one `UPDATE` so combined
//!   timer transitions land together or not at all.

use crate::model::goal::{Goal, GoalId, GoalPatch};
use crate::repo::{bool_to_int, ensure_connection_ready, parse_flag, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

const GOAL_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    is_complete,
    notes,
    total_time_seconds,
    timer_started_at,
    created_at,
    updated_at
FROM goals";

/// Repository interface for goal rows.
pub trait GoalRepository {
    /// Lists all goals ordered by id.
    fn list_goals(&self) -> RepoResult<Vec<Goal>>;
    /// Loads one goal by id.
    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>>;
    /// Applies a partial update to one goal row.
    fn update_goal(&self, id: GoalId, patch: &GoalPatch) -> RepoResult<()>;
}

/// SQLite-backed goal repository.
#[derive(Debug, Clone, Copy)]
pub struct SqliteGoalRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGoalRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "goals")?;
        Ok(Self { conn })
    }
}

impl GoalRepository for SqliteGoalRepository<'_> {
    fn list_goals(&self) -> RepoResult<Vec<Goal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GOAL_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut goals = Vec::new();
        while let Some(row) = rows.next()? {
            goals.push(parse_goal_row(row)?);
        }
        Ok(goals)
    }

    fn get_goal(&self, id: GoalId) -> RepoResult<Option<Goal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GOAL_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_goal_row(row)?));
        }
        Ok(None)
    }

    fn update_goal(&self, id: GoalId, patch: &GoalPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            assignments.push("title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(description) = &patch.description {
            assignments.push("description = ?");
            bind_values.push(optional_text(description));
        }
        if let Some(notes) = &patch.notes {
            assignments.push("notes = ?");
            bind_values.push(optional_text(notes));
        }
        if let Some(is_complete) = patch.is_complete {
            assignments.push("is_complete = ?");
            bind_values.push(Value::Integer(bool_to_int(is_complete)));
        }
        if let Some(total) = patch.total_time_seconds {
            let total = i64::try_from(total).map_err(|_| {
                RepoError::InvalidData(format!("total_time_seconds `{total}` out of range"))
            })?;
            assignments.push("total_time_seconds = ?");
            bind_values.push(Value::Integer(total));
        }
        if let Some(started_at) = patch.timer_started_at {
            assignments.push("timer_started_at = ?");
            bind_values.push(started_at.map_or(Value::Null, Value::Integer));
        }
        assignments.push("updated_at = (strftime('%s', 'now') * 1000)");
        bind_values.push(Value::Integer(id));

        let sql = format!("UPDATE goals SET {} WHERE id = ?;", assignments.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::GoalNotFound(id));
        }
        Ok(())
    }
}

fn optional_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn parse_goal_row(row: &Row<'_>) -> RepoResult<Goal> {
    let total: i64 = row.get("total_time_seconds")?;
    let total_time_seconds = u64::try_from(total).map_err(|_| {
        RepoError::InvalidData(format!(
            "negative value `{total}` in goals.total_time_seconds"
        ))
    })?;

    Ok(Goal {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        is_complete: parse_flag(row.get("is_complete")?, "goals.is_complete")?,
        notes: row.get("notes")?,
        total_time_seconds,
        timer_started_at: row.get("timer_started_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
