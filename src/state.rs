//! # Shared Telemetry State
//!
//! Holds the latest known telemetry record, written by the ingestion path
//! and read concurrently by the viewer.
//!
//! The whole record sits behind a single `RwLock` so a reader always
//! observes a fully consistent record: fields from two different update
//! cycles can never mix beyond the fields a cycle deliberately left
//! untouched (partial updates persist stale-but-valid values by design).

use std::sync::RwLock;

use crate::extract::TelemetryRecord;

/// Process-wide latest-telemetry holder.
///
/// Created once at startup with the sentinel defaults and shared via
/// `Arc` between the listener (exclusive writer) and any readers.
#[derive(Debug, Default)]
pub struct TelemetryState {
    record: RwLock<TelemetryRecord>,
}

impl TelemetryState {
    /// Create a fresh state with the sentinel defaults
    /// (zeroed numerics, device id `"None"`, empty cell info).
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate the record under the write lock.
    ///
    /// The closure runs with exclusive access, so a concurrent
    /// [`snapshot`](Self::snapshot) sees either the whole update or none
    /// of it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TelemetryRecord),
    {
        let mut record = self.record.write().unwrap_or_else(|e| e.into_inner());
        f(&mut record);
    }

    /// Return a consistent point-in-time copy of the record.
    pub fn snapshot(&self) -> TelemetryRecord {
        self.record.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
