//! Session log of decibel readings

use crate::level::format_db;
use std::fmt;

/// One decibel value derived from one sample block
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Reading(f64);

impl Reading {
    pub fn new(decibels: f64) -> Self {
        Self(decibels)
    }

    pub fn decibels(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_db(self.0))
    }
}

/// Ordered log of readings, most recent last.
///
/// Readings are only ever appended or cleared all at once. Every method takes
/// `&self` or `&mut self`, so a snapshot can never observe a half-written
/// append; sharing across threads goes through the engine's mutex.
#[derive(Debug, Default, Clone)]
pub struct HistoryLog {
    readings: Vec<Reading>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    /// Read-only view of every reading in arrival order
    pub fn snapshot(&self) -> &[Reading] {
        &self.readings
    }

    /// The most recent `count` readings, or all of them if fewer exist
    pub fn tail(&self, count: usize) -> &[Reading] {
        let start = self.readings.len().saturating_sub(count);
        &self.readings[start..]
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<Reading> {
        self.readings.last().copied()
    }

    /// Every reading formatted to one decimal, in arrival order
    pub fn export(&self) -> Vec<String> {
        self.snapshot().iter().map(Reading::to_string).collect()
    }

    /// The export joined with newlines, one reading per line
    pub fn export_text(&self) -> String {
        self.export().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(values: &[f64]) -> HistoryLog {
        let mut log = HistoryLog::new();
        for &v in values {
            log.append(Reading::new(v));
        }
        log
    }

    #[test]
    fn test_append_keeps_arrival_order() {
        let log = log_of(&[-40.0, -20.5, -10.0]);
        let values: Vec<f64> = log.snapshot().iter().map(|r| r.decibels()).collect();
        assert_eq!(values, vec![-40.0, -20.5, -10.0]);
        assert_eq!(log.latest(), Some(Reading::new(-10.0)));
    }

    #[test]
    fn test_tail_returns_most_recent() {
        let log = log_of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(log.tail(2), &[Reading::new(3.0), Reading::new(4.0)]);
        assert_eq!(log.tail(10).len(), 4);
        assert!(log.tail(0).is_empty());
    }

    #[test]
    fn test_clear_then_append() {
        let mut log = log_of(&[-12.0, -13.0]);
        log.clear();
        assert!(log.is_empty());
        assert!(log.export().is_empty());
        assert_eq!(log.export_text(), "");

        log.append(Reading::new(-50.0));
        assert_eq!(log.len(), 1);
        assert_eq!(log.export(), vec!["-50.0".to_string()]);
    }

    #[test]
    fn test_export_text_is_newline_joined() {
        let log = log_of(&[-30.0, -18.24, -120.0]);
        assert_eq!(log.export_text(), "-30.0\n-18.2\n-120.0");
    }

    #[test]
    fn test_export_does_not_mutate() {
        let log = log_of(&[-1.0, -2.0]);
        let _ = log.export();
        assert_eq!(log.len(), 2);
    }
}
