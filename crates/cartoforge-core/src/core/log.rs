// crates/cartoforge-core/src/core/log.rs
// ============================================================================
// Module: Cartoforge Generation Log
// Description: Append-only collecting log with level classification.
// Purpose: Record what a generation run did as its single durable trace.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every generation run writes into a [`GenerationLog`]: an append-only,
//! single-writer sequence of levelled entries. Readers take snapshots and
//! observers receive each entry as it is appended, which backs the streaming
//! task surface. Debug entries are forwarded to observers but not retained.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Log Entries
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic output, not retained in the collected log.
    Debug,
    /// Informational progress entry.
    Info,
    /// Recoverable problem; generation continues.
    Warning,
    /// Error; fatal unless the run tolerates errors.
    Error,
    /// Unrecoverable error; the run never publishes.
    Critical,
}

impl LogLevel {
    /// Returns a stable lowercase label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collected log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Entry severity.
    pub level: LogLevel,
    /// Entry message.
    pub message: String,
}

// ============================================================================
// SECTION: Generation Log
// ============================================================================

/// Observer callback invoked for every appended entry.
type LogObserver = Box<dyn Fn(&LogEntry) + Send + Sync>;

/// Append-only collecting log for one generation run.
#[derive(Default)]
pub struct GenerationLog {
    /// Collected entries; debug entries are not retained.
    entries: Mutex<Vec<LogEntry>>,
    /// Observers notified of every entry, including debug.
    observers: Mutex<Vec<LogObserver>>,
}

impl GenerationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer invoked for each subsequently appended entry.
    pub fn subscribe(&self, observer: impl Fn(&LogEntry) + Send + Sync + 'static) {
        let mut guard = self.observers.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.push(Box::new(observer));
    }

    /// Appends an entry at the given level.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            level,
            message: message.into(),
        };
        {
            let guard = self.observers.lock().unwrap_or_else(|poison| poison.into_inner());
            for observer in guard.iter() {
                observer(&entry);
            }
        }
        if level == LogLevel::Debug {
            return;
        }
        let mut guard = self.entries.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.push(entry);
    }

    /// Appends a debug entry (observers only).
    pub fn debug(&self, message: impl Into<String>) {
        self.append(LogLevel::Debug, message);
    }

    /// Appends an info entry.
    pub fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message);
    }

    /// Appends a warning entry.
    pub fn warning(&self, message: impl Into<String>) {
        self.append(LogLevel::Warning, message);
    }

    /// Appends an error entry.
    pub fn error(&self, message: impl Into<String>) {
        self.append(LogLevel::Error, message);
    }

    /// Appends a critical entry.
    pub fn critical(&self, message: impl Into<String>) {
        self.append(LogLevel::Critical, message);
    }

    /// Returns a snapshot of the collected entries.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let guard = self.entries.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.clone()
    }

    /// Returns true when any entry at or above the level was collected.
    #[must_use]
    pub fn has_level(&self, level: LogLevel) -> bool {
        let guard = self.entries.lock().unwrap_or_else(|poison| poison.into_inner());
        guard.iter().any(|entry| entry.level >= level)
    }
}

impl fmt::Debug for GenerationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationLog").finish_non_exhaustive()
    }
}
