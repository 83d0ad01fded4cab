use super::{record_run, TallyProgram};
use crate::error::KernelError;
use crate::program::Program;
use crate::replay::{replay_from_initial, Replay, ReplayPolicy};
use crate::snapshot::blake3::state_digest;
use crate::types::{RequestDescriptor, ResponseDescriptor};
use std::vec::Vec;

fn increments(n: usize) -> Vec<RequestDescriptor> {
    (0..n).map(|_| RequestDescriptor::new("POST", "/count")).collect()
}

#[test]
fn test_replay_rebuilds_state() {
    let records = record_run(&increments(3));
    let (state, last) = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default()).unwrap();
    assert_eq!(last, 3);
    assert_eq!(state.get("count"), Some(&3));
}

#[test]
fn test_replay_from_base_matches_full_replay() {
    let records = record_run(&increments(10));
    let program = TallyProgram;

    let (full, _) = replay_from_initial(&program, &records, ReplayPolicy::default()).unwrap();

    // Base state at 4, then records 5..=10
    let (base, base_seq) =
        replay_from_initial(&program, &records[..4], ReplayPolicy::default()).unwrap();
    let mut replay = Replay::new(&program, base, base_seq, ReplayPolicy::default());
    for record in &records[4..] {
        replay.apply(record).unwrap();
    }
    assert_eq!(replay.applied(), 6);
    let (partial, last) = replay.finish();

    assert_eq!(last, 10);
    assert_eq!(partial, full);
}

#[test]
fn test_replay_rejects_gap() {
    let mut records = record_run(&increments(4));
    records.remove(2); // drop sequence 3

    let result = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default());
    assert_eq!(
        result.unwrap_err(),
        KernelError::SequenceGap { expected: 3, found: 4 }
    );
}

#[test]
fn test_replay_detects_response_mismatch() {
    let mut records = record_run(&increments(3));
    records[1].response = ResponseDescriptor::ok("999");

    let result = replay_from_initial(&TallyProgram, &records, ReplayPolicy::default());
    assert_eq!(result.unwrap_err(), KernelError::NonDeterministic { sequence: 2 });

    // Trusting recorded responses skips the check.
    let trusting = ReplayPolicy {
        verify_responses: false,
        ..ReplayPolicy::default()
    };
    let (state, _) = replay_from_initial(&TallyProgram, &records, trusting).unwrap();
    assert_eq!(state.get("count"), Some(&3));
}

#[test]
fn test_replay_checks_recorded_digest() {
    let program = TallyProgram;
    let mut records = record_run(&increments(2));

    let mut state = program.initial_state();
    for record in records.iter_mut() {
        state = program.apply(&state, &record.request).state;
        record.state_digest = Some(state_digest(&state).unwrap());
    }
    assert!(replay_from_initial(&program, &records, ReplayPolicy::default()).is_ok());

    records[1].state_digest = Some([0u8; 32]);
    let result = replay_from_initial(&program, &records, ReplayPolicy::default());
    assert_eq!(result.unwrap_err(), KernelError::DigestMismatch { sequence: 2 });
}
