//! Domain records for goals and their checklist subtasks.
//!
//! # Responsibility
//! - Define row-shaped records exchanged with the persistence capability.
//! - Define partial-update patches so every write names exactly the columns
//!   it touches.
//!
//! # Invariants
//! - Goal ids are stable integers seeded once; core never creates goals.
//! - Subtask ids are UUID v4 values assigned at creation and never reused.

pub mod goal;
pub mod subtask;
