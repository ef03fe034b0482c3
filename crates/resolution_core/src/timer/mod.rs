//! Goal timer: elapsed-time accounting and start/stop transitions.
//!
//! # Responsibility
//! - Derive the live elapsed time from stored columns without a ticking
//!   process (`elapsed`).
//! - Own the two timer transitions and their persistence (`controller`).
//! - Provide a cancellable display tick bound to a view lifetime (`ticker`).
//!
//! # Invariants
//! - Elapsed time is recomputed on demand and never persisted while running.
//! - A failed write leaves the cached timer state untouched.

pub mod clock;
pub mod controller;
pub mod elapsed;
pub mod ticker;
