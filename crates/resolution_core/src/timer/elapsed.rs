//! Pure elapsed-time calculation.
//!
//! The calculation reads the caller's wall clock. If that clock is moved
//! backward (NTP correction, manual change) while a timer runs, successive
//! readings inside the same running interval can decrease. Negative spans
//! are floored at zero but the non-monotonic reading itself is not masked.

/// Returns the elapsed whole seconds for a goal timer at `now_ms`.
///
/// - `started_at_ms == None` (stopped): returns `accumulated` unchanged.
/// - Otherwise: `accumulated + max(0, floor((now_ms - started_at_ms) / 1000))`.
pub fn elapsed_seconds(started_at_ms: Option<i64>, accumulated: u64, now_ms: i64) -> u64 {
    let Some(started_at_ms) = started_at_ms else {
        return accumulated;
    };
    let span_ms = now_ms.saturating_sub(started_at_ms).max(0);
    // span_ms is non-negative, so integer division floors.
    accumulated.saturating_add((span_ms / 1000) as u64)
}

/// Renders seconds as zero-padded `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
