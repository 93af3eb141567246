//! Once-per-day execution gate.
//!
//! The gate remembers the calendar date of the last run in a small text file
//! (`YYYY-MM-DD`, one line). A run proceeds when there is no such file or when
//! the stored date differs from today's local date.
//!
//! Dates come from the local system clock at calendar-day granularity, so a
//! run just before midnight and another just after both proceed, and a DST
//! change never matters beyond that.

use chrono::{Local, NaiveDate};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to write gate file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persistent record of the last day a run happened.
#[derive(Debug, Clone)]
pub struct DateGate {
    path: PathBuf,
}

impl DateGate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Whether a run should happen today.
    ///
    /// Returns `true` if nothing has been recorded yet or the recorded date is
    /// not today. Never writes anything.
    pub fn proceed(&self) -> bool {
        self.proceed_on(today())
    }

    /// [`DateGate::proceed`] against an explicit "today".
    pub fn proceed_on(&self, today: NaiveDate) -> bool {
        match self.last_run() {
            Some(saved) => {
                let today = today.format(DATE_FORMAT).to_string();
                debug!(%saved, %today, "Comparing gate date");
                saved != today
            }
            None => true,
        }
    }

    /// Record today as the last run date, replacing whatever was stored.
    pub fn save_date(&self) -> Result<(), GateError> {
        self.save_on(today())
    }

    /// [`DateGate::save_date`] with an explicit date.
    pub fn save_on(&self, date: NaiveDate) -> Result<(), GateError> {
        let stamp = date.format(DATE_FORMAT).to_string();
        fs::write(&self.path, &stamp).map_err(|source| GateError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), date = %stamp, "Saved run date");
        Ok(())
    }

    /// The stored date string, trimmed, if the gate file can be read.
    pub fn last_run(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable gate file; treating as not run");
                None
            }
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_proceed_without_gate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_success");
        let gate = DateGate::new(&path);
        assert!(gate.proceed());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_then_proceed_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DateGate::new(dir.path().join("last_success"));
        gate.save_date().unwrap();
        assert!(!gate.proceed());
    }

    #[test]
    fn test_proceed_on_later_day() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DateGate::new(dir.path().join("last_success"));
        gate.save_on(date(2025, 5, 6)).unwrap();
        assert!(!gate.proceed_on(date(2025, 5, 6)));
        assert!(gate.proceed_on(date(2025, 5, 7)));
    }

    #[test]
    fn test_saved_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_success");
        let gate = DateGate::new(&path);
        gate.save_on(date(2025, 1, 9)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "2025-01-09");
    }

    #[test]
    fn test_save_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_success");
        let gate = DateGate::new(&path);
        gate.save_on(date(2025, 1, 9)).unwrap();
        gate.save_on(date(2025, 1, 9)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "2025-01-09");
    }

    #[test]
    fn test_trailing_newline_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_success");
        fs::write(&path, "2025-03-01\n").unwrap();
        let gate = DateGate::new(&path);
        assert!(!gate.proceed_on(date(2025, 3, 1)));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DateGate::new(dir.path().join("nope").join("last_success"));
        assert!(matches!(gate.save_date(), Err(GateError::Write { .. })));
    }
}
