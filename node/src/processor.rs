// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Request Processor
//!
//! Owns the program state. For each request, in order:
//! 1. Let the snapshot manager capture the committed state if due
//! 2. Apply the program once
//! 3. Append the transition to the event log
//! 4. Commit the new state only if the append succeeded
//!
//! `handle` takes `&mut self`; the worker thread is the only caller.

use crate::config::EngineOptions;
use crate::errors::ProcessError;
use crate::events::EventLog;
use crate::recovery::{Recovered, RecoveryCoordinator};
use crate::snapshot::SnapshotManager;
use crate::store::DurableStore;
use statehost_kernel::snapshot::blake3::state_digest;
use statehost_kernel::{Program, RequestDescriptor, ResponseDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub struct RequestProcessor<P: Program, S: DurableStore> {
    program: P,
    state: P::State,
    log: EventLog<S>,
    snapshots: SnapshotManager<S>,
    options: EngineOptions,
    committed: Arc<AtomicU64>,
}

impl<P: Program, S: DurableStore> RequestProcessor<P, S> {
    /// Runs recovery against `store` and returns a processor ready for the
    /// next sequence number.
    pub fn open(program: P, store: Arc<S>, options: EngineOptions) -> Result<Self, ProcessError> {
        let mut log = EventLog::open(store.clone());
        let mut snapshots = SnapshotManager::new(store, options.format, options.snapshot);

        let recovered: Recovered<P::State> =
            RecoveryCoordinator::new(&program, &log, &snapshots, options.replay).recover()?;

        log.resume(recovered.last_sequence);
        snapshots.resume(
            recovered.snapshot_sequence,
            recovered.replayed,
            recovered.replayed_bytes,
        );
        metrics::gauge!("statehost_sequence", recovered.last_sequence as f64);

        Ok(Self {
            program,
            state: recovered.state,
            log,
            snapshots,
            options,
            committed: Arc::new(AtomicU64::new(recovered.last_sequence)),
        })
    }

    pub fn handle(&mut self, request: RequestDescriptor) -> Result<ResponseDescriptor, ProcessError> {
        let start = Instant::now();

        if let Some(written) = self.snapshots.maybe_snapshot(&self.state, self.log.last_sequence()) {
            let through = written.oldest_retained.filter(|_| self.snapshots.policy().compact_log);
            if let Some(through) = through {
                match self.log.compact_through(through) {
                    Ok(removed) => tracing::info!(removed, through, "Compacted event log"),
                    Err(e) => tracing::warn!("Log compaction failed: {}", e),
                }
            }
        }

        let transition = self.program.apply(&self.state, &request);

        let digest = if self.options.replay.record_state_digest {
            Some(state_digest(&transition.state).map_err(ProcessError::Digest)?)
        } else {
            None
        };

        let entry = match self.log.append(request, transition.response, digest) {
            Ok(entry) => entry,
            Err(e) => {
                metrics::counter!("statehost_append_failures_total", 1);
                tracing::error!("Append of record {} failed: {}", self.log.next_sequence(), e);
                return Err(ProcessError::Append(e));
            }
        };

        self.state = transition.state;
        self.snapshots.note_appended(entry.encoded_len);

        let sequence = entry.record.sequence;
        self.committed.store(sequence, Ordering::SeqCst);

        metrics::counter!("statehost_requests_total", 1);
        metrics::gauge!("statehost_sequence", sequence as f64);
        metrics::histogram!("statehost_request_duration_seconds", start.elapsed().as_secs_f64());
        tracing::debug!(
            target: "statehost::program",
            sequence,
            method = %entry.record.request.method,
            uri = %entry.record.request.uri,
            status = entry.record.response.status,
            "Committed"
        );

        Ok(entry.record.response)
    }

    pub fn state(&self) -> &P::State {
        &self.state
    }

    pub fn last_sequence(&self) -> u64 {
        self.log.last_sequence()
    }

    /// Shared view of the last committed sequence, readable without going
    /// through the processor.
    pub fn committed_sequence(&self) -> Arc<AtomicU64> {
        self.committed.clone()
    }

    pub fn last_snapshot(&self) -> u64 {
        self.snapshots.last_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryOptions, SnapshotPolicy};
    use crate::programs::KeyValueProgram;
    use crate::store::{MemoryStore, RetryPolicy};
    use std::io;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(RetryPolicy::new(RetryOptions::immediate(3))))
    }

    fn increment() -> RequestDescriptor {
        RequestDescriptor::new("POST", "/counter/increment")
    }

    #[test]
    fn test_handle_commits_and_counts() {
        let mut processor = RequestProcessor::open(KeyValueProgram, store(), EngineOptions::default()).unwrap();
        let committed = processor.committed_sequence();

        assert_eq!(processor.handle(increment()).unwrap().body, b"1");
        assert_eq!(processor.handle(increment()).unwrap().body, b"2");
        assert_eq!(processor.state().counter, 2);
        assert_eq!(committed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_append_failure_leaves_state_unchanged() {
        let store = store();
        let mut processor = RequestProcessor::open(KeyValueProgram, store.clone(), EngineOptions::default()).unwrap();
        processor.handle(increment()).unwrap();

        store.inject_failures(io::ErrorKind::TimedOut, 3);
        assert!(matches!(processor.handle(increment()), Err(ProcessError::Append(_))));
        assert_eq!(processor.state().counter, 1);
        assert_eq!(processor.last_sequence(), 1);

        assert_eq!(processor.handle(increment()).unwrap().body, b"2");
        assert_eq!(processor.last_sequence(), 2);
    }

    #[test]
    fn test_reopen_recovers_state() {
        let store = store();
        {
            let mut processor = RequestProcessor::open(KeyValueProgram, store.clone(), EngineOptions::default()).unwrap();
            processor
                .handle(RequestDescriptor::new("PUT", "/kv/colour").with_body("teal"))
                .unwrap();
            processor.handle(increment()).unwrap();
        }

        let mut processor = RequestProcessor::open(KeyValueProgram, store, EngineOptions::default()).unwrap();
        assert_eq!(processor.last_sequence(), 2);
        assert_eq!(processor.handle(RequestDescriptor::new("GET", "/kv/colour")).unwrap().body, b"teal");
        assert_eq!(processor.last_sequence(), 3);
    }

    #[test]
    fn test_snapshot_and_compaction() {
        let store = store();
        let options = EngineOptions {
            snapshot: SnapshotPolicy {
                retain: 1,
                compact_log: true,
                ..SnapshotPolicy::every(2)
            },
            ..EngineOptions::default()
        };

        let mut processor = RequestProcessor::open(KeyValueProgram, store.clone(), options).unwrap();
        for _ in 0..5 {
            processor.handle(increment()).unwrap();
        }
        // Snapshots at 2 and 4; retention keeps 4 and compaction drops 1..=4.
        assert_eq!(processor.last_snapshot(), 4);
        assert_eq!(store.list("log/").unwrap().len(), 1);

        let reopened = RequestProcessor::open(KeyValueProgram, store, options).unwrap();
        assert_eq!(reopened.state().counter, 5);
        assert_eq!(reopened.last_sequence(), 5);
    }

    #[test]
    fn test_state_digest_is_recorded_and_verified() {
        let store = store();
        let mut options = EngineOptions::default();
        options.replay.record_state_digest = true;

        let mut processor = RequestProcessor::open(KeyValueProgram, store.clone(), options).unwrap();
        processor.handle(increment()).unwrap();

        let log = EventLog::open(store.clone());
        let entry = log.read_from(1).unwrap().next().unwrap().unwrap();
        assert!(entry.record.state_digest.is_some());

        assert!(RequestProcessor::open(KeyValueProgram, store, EngineOptions::default()).is_ok());
    }
}
