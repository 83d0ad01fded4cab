// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Crash Recovery
//!
//! Rebuilds program state on startup:
//! 1. Newest snapshot that reads, checksums and decodes cleanly (else the
//!    initial state at sequence 0)
//! 2. Replay of every record after it, in order, with no gaps
//!
//! Bad snapshots only cost replay time. A bad record, a gap, or a replayed
//! transition that disagrees with the log stops the node from starting.

use crate::errors::RecoveryError;
use crate::events::EventLog;
use crate::snapshot::SnapshotManager;
use crate::store::DurableStore;
use statehost_kernel::{Program, Replay, ReplayPolicy};
use std::time::Instant;

/// Output of a successful recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered<T> {
    pub state: T,
    /// Sequence of the snapshot used as base, 0 if none.
    pub snapshot_sequence: u64,
    /// Last sequence applied; the next append uses `last_sequence + 1`.
    pub last_sequence: u64,
    /// Records replayed on top of the snapshot.
    pub replayed: u64,
    /// Encoded size of the replayed records.
    pub replayed_bytes: u64,
}

impl<T> Recovered<T> {
    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }
}

pub struct RecoveryCoordinator<'a, P: Program, S: DurableStore> {
    program: &'a P,
    log: &'a EventLog<S>,
    snapshots: &'a SnapshotManager<S>,
    policy: ReplayPolicy,
}

impl<'a, P: Program, S: DurableStore> RecoveryCoordinator<'a, P, S> {
    pub fn new(
        program: &'a P,
        log: &'a EventLog<S>,
        snapshots: &'a SnapshotManager<S>,
        policy: ReplayPolicy,
    ) -> Self {
        Self {
            program,
            log,
            snapshots,
            policy,
        }
    }

    pub fn recover(&self) -> Result<Recovered<P::State>, RecoveryError> {
        let start = Instant::now();

        let (base_state, base_sequence) = match self.base()? {
            Some((state, sequence)) => {
                tracing::info!("Recovering from snapshot at sequence {}", sequence);
                (state, sequence)
            }
            None => {
                tracing::info!("No usable snapshot, replaying from the initial state");
                (self.program.initial_state(), 0)
            }
        };

        let mut replay = Replay::new(self.program, base_state, base_sequence, self.policy);
        let mut replayed_bytes = 0;

        for entry in self.log.read_from(base_sequence + 1)? {
            let entry = entry.map_err(|e| {
                tracing::error!("Event log is unreadable: {}", e);
                RecoveryError::Log(e)
            })?;
            replay.apply(&entry.record).map_err(|e| {
                tracing::error!("Replay stopped at record {}: {}", entry.record.sequence, e);
                RecoveryError::Replay(e)
            })?;
            replayed_bytes += entry.encoded_len;
        }

        let replayed = replay.applied();
        let (state, last_sequence) = replay.finish();

        let elapsed = start.elapsed();
        metrics::histogram!("statehost_replay_duration_seconds", elapsed.as_secs_f64());
        tracing::info!(
            snapshot = base_sequence,
            replayed,
            last_sequence,
            ?elapsed,
            "Recovery complete"
        );

        Ok(Recovered {
            state,
            snapshot_sequence: base_sequence,
            last_sequence,
            replayed,
            replayed_bytes,
        })
    }

    /// Newest snapshot whose frame and state both decode.
    fn base(&self) -> Result<Option<(P::State, u64)>, RecoveryError> {
        let sequences = self
            .snapshots
            .snapshot_sequences()
            .map_err(RecoveryError::Snapshots)?;

        for sequence in sequences {
            let decoded = self
                .snapshots
                .load_snapshot(sequence)
                .map_err(|e| e.to_string())
                .and_then(|snapshot| snapshot.decode_state::<P::State>().map_err(|e| e.to_string()));

            match decoded {
                Ok(state) => return Ok(Some((state, sequence))),
                Err(e) => tracing::warn!("Skipping snapshot {}: {}", sequence, e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryOptions, SnapshotPolicy};
    use crate::errors::EventLogError;
    use crate::store::{MemoryStore, RetryPolicy};
    use statehost_kernel::{KernelError, RequestDescriptor, ResponseDescriptor, SnapshotFormat, Transition};
    use statehost_persistence::naming::{record_name, snapshot_name};
    use std::sync::Arc;

    /// Running sum of the numbers posted to `/add`.
    struct Sum;

    impl Program for Sum {
        type State = u64;

        fn initial_state(&self) -> u64 {
            0
        }

        fn apply(&self, state: &u64, request: &RequestDescriptor) -> Transition<u64> {
            let n: u64 = std::str::from_utf8(&request.body)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let next = state + n;
            Transition::new(next, ResponseDescriptor::ok(next.to_string()))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        log: EventLog<MemoryStore>,
        snapshots: SnapshotManager<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new(RetryPolicy::new(RetryOptions::immediate(2))));
            Self {
                log: EventLog::open(store.clone()),
                snapshots: SnapshotManager::new(store.clone(), SnapshotFormat::Json, SnapshotPolicy::never()),
                store,
            }
        }

        /// Appends `values` as `/add` requests, returning the final sum.
        fn run(&mut self, values: &[u64]) -> u64 {
            let mut state = 0;
            for v in values {
                let request = RequestDescriptor::new("POST", "/add").with_body(v.to_string());
                let transition = Sum.apply(&state, &request);
                self.log.append(request, transition.response, None).unwrap();
                state = transition.state;
            }
            state
        }

        fn recover(&self) -> Result<Recovered<u64>, RecoveryError> {
            RecoveryCoordinator::new(&Sum, &self.log, &self.snapshots, ReplayPolicy::default()).recover()
        }
    }

    #[test]
    fn test_empty_store_recovers_initial_state() {
        let f = Fixture::new();
        let recovered = f.recover().unwrap();
        assert_eq!(recovered.state, 0);
        assert_eq!(recovered.next_sequence(), 1);
    }

    #[test]
    fn test_full_replay() {
        let mut f = Fixture::new();
        let sum = f.run(&[1, 2, 3]);
        let recovered = f.recover().unwrap();
        assert_eq!(recovered.state, sum);
        assert_eq!(recovered.last_sequence, 3);
        assert_eq!(recovered.replayed, 3);
        assert!(recovered.replayed_bytes > 0);
    }

    #[test]
    fn test_snapshot_plus_tail() {
        let mut f = Fixture::new();
        f.run(&[1, 2, 3]);
        f.snapshots.write_snapshot(&6u64, 3).unwrap();
        assert_eq!(f.recover().unwrap().replayed, 0);

        f.log
            .append(RequestDescriptor::new("POST", "/add").with_body("4"), ResponseDescriptor::ok("10"), None)
            .unwrap();
        let recovered = f.recover().unwrap();
        assert_eq!(recovered.snapshot_sequence, 3);
        assert_eq!(recovered.replayed, 1);
        assert_eq!(recovered.state, 10);
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_full_replay() {
        let mut f = Fixture::new();
        f.run(&[5, 5]);
        f.snapshots.write_snapshot(&10u64, 2).unwrap();
        f.store.corrupt(&snapshot_name(2)).unwrap();

        let recovered = f.recover().unwrap();
        assert_eq!(recovered.snapshot_sequence, 0);
        assert_eq!(recovered.state, 10);
        assert_eq!(recovered.replayed, 2);
    }

    #[test]
    fn test_undecodable_snapshot_state_is_skipped() {
        let mut f = Fixture::new();
        f.run(&[1]);
        f.snapshots.write_snapshot(&"not a number", 1).unwrap();
        let recovered = f.recover().unwrap();
        assert_eq!(recovered.snapshot_sequence, 0);
        assert_eq!(recovered.state, 1);
    }

    #[test]
    fn test_corrupt_record_is_fatal() {
        let mut f = Fixture::new();
        f.run(&[1, 2, 3]);
        f.store.corrupt(&record_name(2)).unwrap();
        assert!(matches!(
            f.recover(),
            Err(RecoveryError::Log(EventLogError::Corrupt { .. }))
        ));
    }

    #[test]
    fn test_gap_is_fatal() {
        let mut f = Fixture::new();
        f.run(&[1, 2, 3]);
        f.store.remove(&record_name(2)).unwrap();
        assert!(matches!(
            f.recover(),
            Err(RecoveryError::Replay(KernelError::SequenceGap { expected: 2, found: 3 }))
        ));
    }

    #[test]
    fn test_response_mismatch_is_fatal() {
        let mut f = Fixture::new();
        f.log
            .append(RequestDescriptor::new("POST", "/add").with_body("2"), ResponseDescriptor::ok("3"), None)
            .unwrap();
        assert!(matches!(
            f.recover(),
            Err(RecoveryError::Replay(KernelError::NonDeterministic { sequence: 1 }))
        ));
    }
}
