//! Ordered-list reconciliation for subtask checklists.

pub mod reconciler;
