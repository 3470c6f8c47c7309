//! Observer interface through which the engines report progress.
//!
//! The core never talks to a UI directly; a front end implements
//! [`OrganizeObserver`] and receives progress, log lines and per-file
//! outcomes on the worker's cadence (every 10 organizer files, 50 duplicate
//! files, 100 compared files).

/// Severity attached to observer log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// Outcome reported for each processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    Moved,
    Simulated,
}

impl MoveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveStatus::Moved => "moved",
            MoveStatus::Simulated => "simulated",
        }
    }
}

/// Synchronous observer for engine progress. All methods default to no-ops,
/// so implementors only override what they care about.
pub trait OrganizeObserver: Send {
    fn progress(&mut self, _current: usize, _total: usize) {}

    fn log(&mut self, _message: &str, _level: LogLevel) {}

    fn file_processed(&mut self, _filename: &str, _destination: &str, _status: MoveStatus) {}
}

/// Observer that discards everything
pub struct NullObserver;

impl OrganizeObserver for NullObserver {}
