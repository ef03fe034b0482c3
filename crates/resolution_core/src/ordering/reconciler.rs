//! Pure reconciler for dense positional ordinals.
//!
//! # Responsibility
//! - Apply one structural change (insert, remove, move) to an ordered id
//!   sequence.
//! - Report every id whose ordinal differs from its persisted value.
//!
//! # Invariants
//! - After any change, ordinals are exactly `0..n` in sequence order.
//! - Out-of-range positions are clamped, never rejected.
//! - Ordinals are compared against the persisted `sort_order`, so duplicate
//!   or sparse input ordinals are repaired by the next structural change.
//!
//! Every item is re-derived on every change. Gap-based ordinals would issue
//! fewer writes but are not used here.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// One item of the current sequence with its persisted ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedItem<Id> {
    pub id: Id,
    pub sort_order: i64,
}

/// Where a moved item should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    /// Final index in the resulting list, clamped into `[0, n-1]`.
    Index(usize),
    /// Drop slot counted on the list before removal, clamped into `[0, n]`.
    /// Slots after the source position shift down by one once the item is
    /// lifted out.
    Slot(usize),
}

/// One structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOp<Id> {
    InsertAt { id: Id, position: usize },
    Remove { id: Id },
    Move { id: Id, target: MoveTarget },
}

/// New ordinal for one id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalChange<Id> {
    pub id: Id,
    pub sort_order: i64,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<Id> {
    /// Resulting order; the ordinal of each id is its index.
    pub sequence: Vec<Id>,
    /// Ids whose ordinal changed, in sequence order.
    pub changes: Vec<OrdinalChange<Id>>,
}

impl<Id> Reconciliation<Id> {
    /// Full dense assignment `(id, ordinal)` for the resulting sequence.
    pub fn ordinals(&self) -> impl Iterator<Item = (&Id, i64)> {
        self.sequence
            .iter()
            .enumerate()
            .map(|(index, id)| (id, index as i64))
    }
}

/// Structural change refers to an id that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError<Id> {
    /// Remove/move target is not in the sequence.
    UnknownId(Id),
    /// Insert id already present in the sequence.
    DuplicateId(Id),
}

impl<Id: Display> Display for ReconcileError<Id> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownId(id) => write!(f, "id not in sequence: {id}"),
            Self::DuplicateId(id) => write!(f, "id already in sequence: {id}"),
        }
    }
}

impl<Id: Debug + Display> Error for ReconcileError<Id> {}

/// Applies `op` to `current` and derives the new dense ordinals.
///
/// `current` must already be in display order (persisted `sort_order`, ties
/// broken by the repository).
pub fn reconcile<Id: Clone + Eq>(
    current: &[RankedItem<Id>],
    op: ListOp<Id>,
) -> Result<Reconciliation<Id>, ReconcileError<Id>> {
    let mut sequence: Vec<Id> = current.iter().map(|item| item.id.clone()).collect();

    match op {
        ListOp::InsertAt { id, position } => {
            if sequence.contains(&id) {
                return Err(ReconcileError::DuplicateId(id));
            }
            let position = position.min(sequence.len());
            sequence.insert(position, id);
        }
        ListOp::Remove { id } => {
            let index = position_of(&sequence, &id)?;
            sequence.remove(index);
        }
        ListOp::Move { id, target } => {
            let len_before = sequence.len();
            let source = position_of(&sequence, &id)?;
            let destination = match target {
                MoveTarget::Index(index) => index.min(len_before - 1),
                MoveTarget::Slot(slot) => {
                    let slot = slot.min(len_before);
                    if source < slot {
                        slot - 1
                    } else {
                        slot
                    }
                }
            };
            let item = sequence.remove(source);
            sequence.insert(destination, item);
        }
    }

    let changes = sequence
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let sort_order = index as i64;
            let persisted = current
                .iter()
                .find(|item| item.id == *id)
                .map(|item| item.sort_order);
            (persisted != Some(sort_order)).then(|| OrdinalChange {
                id: id.clone(),
                sort_order,
            })
        })
        .collect();

    Ok(Reconciliation { sequence, changes })
}

fn position_of<Id: Clone + Eq>(sequence: &[Id], id: &Id) -> Result<usize, ReconcileError<Id>> {
    sequence
        .iter()
        .position(|candidate| candidate == id)
        .ok_or_else(|| ReconcileError::UnknownId(id.clone()))
}
