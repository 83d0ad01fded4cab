// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Transition Records
//!
//! Every request the engine accepted is expressed as one `TransitionRecord`.
//! The event log is the ordered sequence of these records and is the only
//! source of truth; snapshots are a cache over it.
//!
//! # Invariants
//! - Sequence numbers start at 1 and are gapless
//! - Records are immutable once appended
//! - The timestamp is informational and never feeds back into state

use crate::types::{RequestDescriptor, ResponseDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub sequence: u64,
    /// Milliseconds since the Unix epoch when the record was appended.
    pub timestamp_ms: u64,
    pub request: RequestDescriptor,
    pub response: ResponseDescriptor,
    /// BLAKE3 digest of the state produced by this transition, if recorded.
    pub state_digest: Option<[u8; 32]>,
}

impl TransitionRecord {
    pub fn new(
        sequence: u64,
        timestamp_ms: u64,
        request: RequestDescriptor,
        response: ResponseDescriptor,
    ) -> Self {
        Self {
            sequence,
            timestamp_ms,
            request,
            response,
            state_digest: None,
        }
    }

    pub fn with_state_digest(mut self, digest: [u8; 32]) -> Self {
        self.state_digest = Some(digest);
        self
    }
}
