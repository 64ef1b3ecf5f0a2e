//! Trailing time-window average over the history log

use crate::error::{MeterError, MeterResult};
use crate::history::HistoryLog;

/// Number of records spanning `duration_secs` at `cadence` readings per second.
/// Never less than one record.
pub fn window_len(duration_secs: f64, cadence: f64) -> usize {
    (duration_secs * cadence).round().max(1.0) as usize
}

/// Mean of the readings that fall inside the trailing window.
///
/// When the log holds fewer readings than the window, all of them are
/// averaged; the window is never padded.
pub fn average(duration_secs: f64, log: &HistoryLog, cadence: f64) -> MeterResult<f64> {
    if log.is_empty() {
        return Err(MeterError::InsufficientData);
    }
    let window = log.tail(window_len(duration_secs, cadence));
    let sum: f64 = window.iter().map(|r| r.decibels()).sum();
    Ok(sum / window.len() as f64)
}
