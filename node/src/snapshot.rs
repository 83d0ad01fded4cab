// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshot Manager
//!
//! Writes the full program state to `snapshots/{sequence:020}.snap` when the
//! policy says so, keeps the newest `retain` snapshots, and loads them back
//! for recovery. Snapshot failures are never fatal: the state is still
//! fully described by the event log.

use crate::config::SnapshotPolicy;
use crate::errors::SnapshotError;
use crate::events::unix_millis;
use crate::store::DurableStore;
use serde::Serialize;
use statehost_kernel::{Snapshot, SnapshotFormat};
use statehost_persistence::naming::{parse_snapshot_name, snapshot_name, SNAPSHOT_PREFIX};
use statehost_persistence::{decode_snapshot, encode_snapshot};
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotWritten {
    pub sequence: u64,
    pub size_bytes: u64,
    /// Oldest snapshot kept by retention that was read back and validated.
    /// `None` when retention could not confirm any, so nothing may be
    /// compacted.
    pub oldest_retained: Option<u64>,
}

pub struct SnapshotManager<S: DurableStore> {
    store: Arc<S>,
    format: SnapshotFormat,
    policy: SnapshotPolicy,
    last_snapshot: u64,
    transitions_since: u64,
    bytes_since: u64,
}

impl<S: DurableStore> SnapshotManager<S> {
    pub fn new(store: Arc<S>, format: SnapshotFormat, policy: SnapshotPolicy) -> Self {
        Self {
            store,
            format,
            policy,
            last_snapshot: 0,
            transitions_since: 0,
            bytes_since: 0,
        }
    }

    /// Restores the trigger counters after recovery.
    pub fn resume(&mut self, last_snapshot: u64, transitions_since: u64, bytes_since: u64) {
        self.last_snapshot = last_snapshot;
        self.transitions_since = transitions_since;
        self.bytes_since = bytes_since;
    }

    /// Accounts for one appended record of `encoded_len` bytes.
    pub fn note_appended(&mut self, encoded_len: u64) {
        self.transitions_since += 1;
        self.bytes_since += encoded_len;
    }

    pub fn last_snapshot(&self) -> u64 {
        self.last_snapshot
    }

    pub fn policy(&self) -> &SnapshotPolicy {
        &self.policy
    }

    /// Writes a snapshot if the policy is due. A failed write is logged and
    /// retried at the next trigger.
    pub fn maybe_snapshot<T: Serialize>(&mut self, state: &T, sequence: u64) -> Option<SnapshotWritten> {
        if sequence <= self.last_snapshot || !self.policy.is_due(self.transitions_since, self.bytes_since) {
            return None;
        }

        match self.write_snapshot(state, sequence) {
            Ok(written) => Some(written),
            Err(e) => {
                tracing::warn!("Snapshot at {} failed, deferring: {}", sequence, e);
                metrics::counter!("statehost_snapshot_failures_total", 1);
                None
            }
        }
    }

    /// Serializes `state` as of `sequence` and persists it, then prunes
    /// snapshots beyond the retention count.
    pub fn write_snapshot<T: Serialize>(&mut self, state: &T, sequence: u64) -> Result<SnapshotWritten> {
        let body = self
            .format
            .encode(state)
            .map_err(|source| SnapshotError::Encode { sequence, source })?;
        let snapshot = Snapshot {
            sequence,
            timestamp_ms: unix_millis(),
            format: self.format,
            state: body,
        };
        let bytes = encode_snapshot(&snapshot).map_err(|source| SnapshotError::Frame { sequence, source })?;

        self.store.write(&snapshot_name(sequence), &bytes)?;

        self.last_snapshot = sequence;
        self.transitions_since = 0;
        self.bytes_since = 0;

        let size_bytes = bytes.len() as u64;
        metrics::counter!("statehost_snapshots_written_total", 1);
        metrics::gauge!("statehost_snapshot_size_bytes", size_bytes as f64);
        tracing::info!(sequence, size_bytes, format = %self.format, "Snapshot written");

        let oldest_retained = self.prune().unwrap_or_else(|e| {
            tracing::warn!("Snapshot retention failed: {}", e);
            None
        });

        Ok(SnapshotWritten {
            sequence,
            size_bytes,
            oldest_retained,
        })
    }

    /// Stored snapshot sequences, newest first.
    pub fn snapshot_sequences(&self) -> Result<Vec<u64>> {
        let mut sequences: Vec<u64> = self
            .store
            .list(SNAPSHOT_PREFIX)?
            .iter()
            .filter_map(|name| parse_snapshot_name(name))
            .collect();
        sequences.sort_unstable_by(|a, b| b.cmp(a));
        Ok(sequences)
    }

    /// Reads and validates one snapshot. The state bytes are not decoded.
    pub fn load_snapshot(&self, sequence: u64) -> Result<Snapshot> {
        let name = snapshot_name(sequence);
        let bytes = self.store.read(&name)?;
        let snapshot = decode_snapshot(&bytes).map_err(|source| SnapshotError::Corrupt {
            name: name.clone(),
            source,
        })?;
        if snapshot.sequence != sequence {
            return Err(SnapshotError::NameMismatch {
                name,
                found: snapshot.sequence,
            });
        }
        Ok(snapshot)
    }

    /// The valid snapshot with the highest sequence. Unreadable snapshots
    /// are skipped.
    pub fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        for sequence in self.snapshot_sequences()? {
            match self.load_snapshot(sequence) {
                Ok(snapshot) => return Ok(Some(snapshot)),
                Err(e) => tracing::warn!("Skipping snapshot {}: {}", sequence, e),
            }
        }
        Ok(None)
    }

    /// Keeps the newest `retain` snapshots that load cleanly. Corrupt ones
    /// are deleted and never count toward `retain`. Returns the oldest kept
    /// snapshot.
    fn prune(&self) -> Result<Option<u64>> {
        let retain = self.policy.retain.max(1);
        let mut kept = Vec::with_capacity(retain);

        for sequence in self.snapshot_sequences()? {
            if kept.len() >= retain {
                self.store.remove(&snapshot_name(sequence))?;
                tracing::debug!(sequence, "Pruned snapshot");
                continue;
            }
            match self.load_snapshot(sequence) {
                Ok(_) => kept.push(sequence),
                Err(e @ (SnapshotError::Corrupt { .. } | SnapshotError::NameMismatch { .. })) => {
                    tracing::warn!("Removing unusable snapshot {}: {}", sequence, e);
                    self.store.remove(&snapshot_name(sequence))?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(kept.last().copied())
    }
}
