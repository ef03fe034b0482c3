//! Subtask repository contract and SQLite implementation.
//!
//! # Invariants
//! - Listing is deterministic: `sort_order ASC, created_at ASC, id ASC`.
//! - `max_sort_order` is a plain read; nothing reserves the next ordinal.

use crate::model::goal::GoalId;
use crate::model::subtask::{NewSubtask, Subtask, SubtaskId, SubtaskPatch};
use crate::repo::{bool_to_int, ensure_connection_ready, parse_flag, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const SUBTASK_SELECT_SQL: &str = "SELECT
    id,
    goal_id,
    text,
    is_complete,
    sort_order,
    created_at
FROM subtasks";

/// Repository interface for subtask rows.
pub trait SubtaskRepository {
    /// Lists one goal's subtasks in persisted order.
    fn list_subtasks(&self, goal_id: GoalId) -> RepoResult<Vec<Subtask>>;
    /// Loads one subtask by id.
    fn get_subtask(&self, id: SubtaskId) -> RepoResult<Option<Subtask>>;
    /// Reads the current maximum ordinal for one goal.
    fn max_sort_order(&self, goal_id: GoalId) -> RepoResult<Option<i64>>;
    /// Inserts one subtask and returns the stored row.
    fn insert_subtask(&self, input: &NewSubtask) -> RepoResult<Subtask>;
    /// Applies a partial update to one subtask row.
    fn update_subtask(&self, id: SubtaskId, patch: &SubtaskPatch) -> RepoResult<()>;
    /// Hard-deletes one subtask row.
    fn delete_subtask(&self, id: SubtaskId) -> RepoResult<()>;
}

/// SQLite-backed subtask repository.
#[derive(Debug, Clone, Copy)]
pub struct SqliteSubtaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubtaskRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "subtasks")?;
        Ok(Self { conn })
    }
}

impl SubtaskRepository for SqliteSubtaskRepository<'_> {
    fn list_subtasks(&self, goal_id: GoalId) -> RepoResult<Vec<Subtask>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBTASK_SELECT_SQL}
             WHERE goal_id = ?1
             ORDER BY sort_order ASC, created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([goal_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_subtask_row(row)?);
        }
        Ok(items)
    }

    fn get_subtask(&self, id: SubtaskId) -> RepoResult<Option<Subtask>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUBTASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subtask_row(row)?));
        }
        Ok(None)
    }

    fn max_sort_order(&self, goal_id: GoalId) -> RepoResult<Option<i64>> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(sort_order)
             FROM subtasks
             WHERE goal_id = ?1;",
            [goal_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn insert_subtask(&self, input: &NewSubtask) -> RepoResult<Subtask> {
        ensure_valid_sort_order(input.sort_order)?;
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO subtasks (
                id,
                goal_id,
                text,
                is_complete,
                sort_order
            ) VALUES (?1, ?2, ?3, 0, ?4);",
            params![
                id.to_string(),
                input.goal_id,
                input.text.as_str(),
                input.sort_order
            ],
        )?;
        self.get_subtask(id)?.ok_or(RepoError::SubtaskNotFound(id))
    }

    fn update_subtask(&self, id: SubtaskId, patch: &SubtaskPatch) -> RepoResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(text) = &patch.text {
            assignments.push("text = ?");
            bind_values.push(Value::Text(text.clone()));
        }
        if let Some(is_complete) = patch.is_complete {
            assignments.push("is_complete = ?");
            bind_values.push(Value::Integer(bool_to_int(is_complete)));
        }
        if let Some(sort_order) = patch.sort_order {
            ensure_valid_sort_order(sort_order)?;
            assignments.push("sort_order = ?");
            bind_values.push(Value::Integer(sort_order));
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE subtasks SET {} WHERE id = ?;",
            assignments.join(", ")
        );
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::SubtaskNotFound(id));
        }
        Ok(())
    }

    fn delete_subtask(&self, id: SubtaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM subtasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::SubtaskNotFound(id));
        }
        Ok(())
    }
}

fn ensure_valid_sort_order(sort_order: i64) -> RepoResult<()> {
    if sort_order < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative sort_order `{sort_order}`"
        )));
    }
    Ok(())
}

fn parse_subtask_row(row: &Row<'_>) -> RepoResult<Subtask> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in subtasks.id")))?;

    let sort_order: i64 = row.get("sort_order")?;
    if sort_order < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative value `{sort_order}` in subtasks.sort_order"
        )));
    }

    Ok(Subtask {
        id,
        goal_id: row.get("goal_id")?,
        text: row.get("text")?,
        is_complete: parse_flag(row.get("is_complete")?, "subtasks.is_complete")?,
        sort_order,
        created_at: row.get("created_at")?,
    })
}
