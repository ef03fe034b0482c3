//! Subtask checklist synchronization for one goal.
//!
//! # Responsibility
//! - Translate add/toggle/edit/delete/reorder intents into a local model
//!   update plus row-level repository writes.
//! - Define the reload-on-error policy for non-atomic structural writes.
//!
//! # Invariants
//! - Structural changes run the reconciler against the latest local
//!   sequence. Mutating methods take `&mut self`, so changes for one goal are
//!   serialized by the borrow; callers sharing a controller across threads
//!   wrap it in a `Mutex`.
//! - A failed structural write is never rolled back. The controller marks
//!   its sequence stale and refuses further structural changes until
//!   `refresh` adopts the authoritative order.
//! - `add` reads the current maximum ordinal and inserts `max + 1`. Two
//!   sessions appending concurrently can pick the same ordinal; the next
//!   structural change re-densifies the list.

use crate::model::goal::GoalId;
use crate::model::subtask::{NewSubtask, Subtask, SubtaskId, SubtaskPatch};
use crate::ordering::reconciler::{reconcile, ListOp, MoveTarget, RankedItem, ReconcileError};
use crate::repo::subtask_repo::SubtaskRepository;
use crate::repo::RepoError;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from subtask synchronization.
#[derive(Debug)]
pub enum SyncError {
    /// Subtask text is blank after trim.
    InvalidText,
    /// Subtask is not part of this goal's list.
    SubtaskNotFound(SubtaskId),
    /// Structural change could not be computed.
    Reconcile(ReconcileError<SubtaskId>),
    /// A single-row write or a read failed.
    Persistence(RepoError),
    /// A structural write batch stopped at its first failure. Writes before
    /// `failed` stay applied.
    PartialWrite {
        applied: usize,
        planned: usize,
        failed: SubtaskId,
        source: RepoError,
    },
    /// The local sequence is stale after a failed write; call `refresh`.
    RefreshRequired,
}

impl SyncError {
    /// Returns whether the caller should refetch before continuing.
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self,
            Self::PartialWrite { .. } | Self::RefreshRequired | Self::SubtaskNotFound(_)
        )
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidText => write!(f, "subtask text must not be blank"),
            Self::SubtaskNotFound(id) => write!(f, "subtask not found: {id}"),
            Self::Reconcile(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::PartialWrite {
                applied,
                planned,
                failed,
                source,
            } => write!(
                f,
                "write for subtask {failed} failed after {applied} of {planned} writes: {source}"
            ),
            Self::RefreshRequired => {
                write!(f, "subtask order is stale after a failed write; refresh first")
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reconcile(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::PartialWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SubtaskNotFound(id) => Self::SubtaskNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl From<ReconcileError<SubtaskId>> for SyncError {
    fn from(value: ReconcileError<SubtaskId>) -> Self {
        match value {
            ReconcileError::UnknownId(id) => Self::SubtaskNotFound(id),
            other => Self::Reconcile(other),
        }
    }
}

/// Local and authoritative orders disagreed on refresh.
///
/// Resolution is always to adopt `authoritative`; there is no merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyDrift {
    pub local: Vec<(SubtaskId, i64)>,
    pub authoritative: Vec<(SubtaskId, i64)>,
}

#[derive(Debug, Clone, Copy)]
enum PlannedWrite {
    Delete(SubtaskId),
    Ordinal(SubtaskId, i64),
}

impl PlannedWrite {
    fn target(&self) -> SubtaskId {
        match self {
            Self::Delete(id) | Self::Ordinal(id, _) => *id,
        }
    }
}

/// Subtask list controller for one goal.
pub struct SubtaskSyncController<R: SubtaskRepository> {
    repo: R,
    goal_id: GoalId,
    items: Vec<Subtask>,
    stale: bool,
}

impl<R: SubtaskRepository> SubtaskSyncController<R> {
    /// Loads the goal's subtasks in persisted order.
    pub fn load(repo: R, goal_id: GoalId) -> Result<Self, SyncError> {
        let items = repo.list_subtasks(goal_id).map_err(SyncError::Persistence)?;
        Ok(Self {
            repo,
            goal_id,
            items,
            stale: false,
        })
    }

    pub fn goal_id(&self) -> GoalId {
        self.goal_id
    }

    /// Current local sequence.
    pub fn items(&self) -> &[Subtask] {
        &self.items
    }

    pub fn get(&self, id: SubtaskId) -> Option<&Subtask> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Returns whether an earlier failure left the local order unreliable.
    pub fn needs_refresh(&self) -> bool {
        self.stale
    }

    /// Refetches the authoritative list and replaces the local one.
    ///
    /// Returns the observed drift when the local order or ordinals differed.
    pub fn refresh(&mut self) -> Result<Option<ConsistencyDrift>, SyncError> {
        let fetched = self
            .repo
            .list_subtasks(self.goal_id)
            .map_err(SyncError::Persistence)?;

        let local = order_signature(&self.items);
        let authoritative = order_signature(&fetched);
        let drift = (local != authoritative).then(|| ConsistencyDrift {
            local,
            authoritative,
        });

        if let Some(drift) = &drift {
            warn!(
                "event=subtask_refresh module=subtask_sync status=drift goal_id={} local_count={} authoritative_count={}",
                self.goal_id,
                drift.local.len(),
                drift.authoritative.len()
            );
        } else {
            debug!(
                "event=subtask_refresh module=subtask_sync status=ok goal_id={} count={}",
                self.goal_id,
                fetched.len()
            );
        }

        self.items = fetched;
        self.stale = false;
        Ok(drift)
    }

    /// Appends a subtask after the current maximum persisted ordinal.
    pub fn add(&mut self, text: impl Into<String>) -> Result<Subtask, SyncError> {
        let text = normalize_text(text.into())?;
        let next_order = self
            .repo
            .max_sort_order(self.goal_id)
            .map_err(SyncError::Persistence)?
            .map_or(0, |max| max + 1);

        let created = self
            .repo
            .insert_subtask(&NewSubtask {
                goal_id: self.goal_id,
                text,
                sort_order: next_order,
            })
            .map_err(|err| {
                error!(
                    "event=subtask_add module=subtask_sync status=error goal_id={} error={}",
                    self.goal_id, err
                );
                SyncError::Persistence(err)
            })?;

        self.items.push(created.clone());
        info!(
            "event=subtask_add module=subtask_sync status=ok goal_id={} subtask_id={} sort_order={}",
            self.goal_id, created.id, created.sort_order
        );
        Ok(created)
    }

    /// Flips the completion flag of one subtask. Returns the new flag.
    pub fn toggle_complete(&mut self, id: SubtaskId) -> Result<bool, SyncError> {
        let next = !self.require(id)?.is_complete;
        self.apply_field_patch("subtask_toggle", id, SubtaskPatch::completion(next))?;
        Ok(next)
    }

    /// Sets the completion flag of one subtask.
    pub fn set_complete(&mut self, id: SubtaskId, is_complete: bool) -> Result<(), SyncError> {
        if self.require(id)?.is_complete == is_complete {
            return Ok(());
        }
        self.apply_field_patch("subtask_toggle", id, SubtaskPatch::completion(is_complete))
    }

    /// Replaces the text of one subtask.
    ///
    /// Returns `false` without writing when the trimmed text is unchanged.
    pub fn edit_text(&mut self, id: SubtaskId, text: impl Into<String>) -> Result<bool, SyncError> {
        let text = normalize_text(text.into())?;
        if self.require(id)?.text == text {
            return Ok(false);
        }
        self.apply_field_patch("subtask_edit", id, SubtaskPatch::text(text))?;
        Ok(true)
    }

    /// Deletes one subtask and re-densifies the ordinals after it.
    ///
    /// Returns the number of ordinal updates issued besides the delete.
    pub fn delete(&mut self, id: SubtaskId) -> Result<usize, SyncError> {
        self.ensure_fresh()?;
        let plan = reconcile(&self.ranked(), ListOp::Remove { id })?;

        let mut writes = vec![PlannedWrite::Delete(id)];
        writes.extend(
            plan.changes
                .iter()
                .map(|change| PlannedWrite::Ordinal(change.id, change.sort_order)),
        );
        self.adopt_sequence(&plan.sequence);
        self.execute("subtask_delete", &writes)?;
        Ok(writes.len() - 1)
    }

    /// Moves one subtask so it ends up at `to_index` in the resulting list.
    ///
    /// Returns the number of ordinal updates issued.
    pub fn reorder(&mut self, id: SubtaskId, to_index: usize) -> Result<usize, SyncError> {
        self.move_to(id, MoveTarget::Index(to_index))
    }

    /// Moves one subtask to a drop slot counted on the list before removal.
    pub fn reorder_to_slot(&mut self, id: SubtaskId, slot: usize) -> Result<usize, SyncError> {
        self.move_to(id, MoveTarget::Slot(slot))
    }

    fn move_to(&mut self, id: SubtaskId, target: MoveTarget) -> Result<usize, SyncError> {
        self.ensure_fresh()?;
        let plan = reconcile(&self.ranked(), ListOp::Move { id, target })?;
        if plan.changes.is_empty() {
            debug!(
                "event=subtask_reorder module=subtask_sync status=noop goal_id={} subtask_id={}",
                self.goal_id, id
            );
            return Ok(0);
        }

        let writes: Vec<PlannedWrite> = plan
            .changes
            .iter()
            .map(|change| PlannedWrite::Ordinal(change.id, change.sort_order))
            .collect();
        self.adopt_sequence(&plan.sequence);
        self.execute("subtask_reorder", &writes)?;
        Ok(writes.len())
    }

    fn ensure_fresh(&self) -> Result<(), SyncError> {
        if self.stale {
            return Err(SyncError::RefreshRequired);
        }
        Ok(())
    }

    fn require(&self, id: SubtaskId) -> Result<&Subtask, SyncError> {
        self.get(id).ok_or(SyncError::SubtaskNotFound(id))
    }

    fn ranked(&self) -> Vec<RankedItem<SubtaskId>> {
        self.items
            .iter()
            .map(|item| RankedItem {
                id: item.id,
                sort_order: item.sort_order,
            })
            .collect()
    }

    fn adopt_sequence(&mut self, sequence: &[SubtaskId]) {
        let mut by_id: HashMap<SubtaskId, Subtask> = self
            .items
            .drain(..)
            .map(|item| (item.id, item))
            .collect();
        self.items = sequence
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                by_id.remove(id).map(|mut item| {
                    item.sort_order = index as i64;
                    item
                })
            })
            .collect();
    }

    fn apply_field_patch(
        &mut self,
        event: &'static str,
        id: SubtaskId,
        patch: SubtaskPatch,
    ) -> Result<(), SyncError> {
        if let Err(err) = self.repo.update_subtask(id, &patch) {
            error!(
                "event={} module=subtask_sync status=error goal_id={} subtask_id={} error={}",
                event, self.goal_id, id, err
            );
            if matches!(err, RepoError::SubtaskNotFound(_)) {
                self.stale = true;
            }
            return Err(err.into());
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            patch.apply_to(item);
        }
        info!(
            "event={} module=subtask_sync status=ok goal_id={} subtask_id={}",
            event, self.goal_id, id
        );
        Ok(())
    }

    fn execute(&mut self, event: &'static str, writes: &[PlannedWrite]) -> Result<(), SyncError> {
        for (applied, write) in writes.iter().enumerate() {
            let result = match *write {
                PlannedWrite::Delete(id) => self.repo.delete_subtask(id),
                PlannedWrite::Ordinal(id, sort_order) => self
                    .repo
                    .update_subtask(id, &SubtaskPatch::sort_order(sort_order)),
            };

            if let Err(source) = result {
                self.stale = true;
                warn!(
                    "event={} module=subtask_sync status=partial_failure goal_id={} applied={} planned={} failed_subtask_id={} error={}",
                    event,
                    self.goal_id,
                    applied,
                    writes.len(),
                    write.target(),
                    source
                );
                return Err(SyncError::PartialWrite {
                    applied,
                    planned: writes.len(),
                    failed: write.target(),
                    source,
                });
            }
        }

        info!(
            "event={} module=subtask_sync status=ok goal_id={} writes={}",
            event,
            self.goal_id,
            writes.len()
        );
        Ok(())
    }
}

fn normalize_text(value: String) -> Result<String, SyncError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::InvalidText);
    }
    Ok(trimmed.to_string())
}

fn order_signature(items: &[Subtask]) -> Vec<(SubtaskId, i64)> {
    items.iter().map(|item| (item.id, item.sort_order)).collect()
}
