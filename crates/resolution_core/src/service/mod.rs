//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into goal, timer and checklist use-cases.
//! - Keep CLI/presentation layers decoupled from storage details.

pub mod board;
pub mod goal_aggregate;
pub mod subtask_sync;
