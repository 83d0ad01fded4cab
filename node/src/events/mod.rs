// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Log
//!
//! Each applied request is one store entry `log/{sequence:020}.rec` holding
//! a checksummed `TransitionRecord`. Entries are written once and never
//! rewritten; sequence numbers start at 1 and have no gaps.
//!
//! # Guarantees
//! - A record is durable before `append` returns
//! - A failed append leaves the next sequence number unchanged
//! - Reads validate every frame and fail on corruption

pub mod event_log;

pub use crate::errors::EventLogError;
pub use event_log::{EventLog, LogEntry, RecordIter};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Timestamps are informational.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
