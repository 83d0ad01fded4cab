//! Deterministic Replay Logic.

// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

use crate::error::{KernelError, KernelResult};
use crate::event::TransitionRecord;
use crate::program::Program;
use crate::snapshot::blake3::state_digest;

/// What replay checks besides sequence contiguity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayPolicy {
    /// Compare each recomputed response with the recorded one.
    /// When off, recorded responses are trusted and only state is rebuilt.
    pub verify_responses: bool,
    /// Store a state digest on every appended record. Digests found on
    /// records are always verified, whatever this flag says.
    pub record_state_digest: bool,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self {
            verify_responses: true,
            record_state_digest: false,
        }
    }
}

/// Folds transition records into a state, one at a time.
///
/// This function family is deterministic: same base state + same records =
/// same final state. It enforces:
/// 1. Records arrive as `base + 1, base + 2, ...` with no gaps.
/// 2. The program reproduces the recorded response (if verifying).
/// 3. The program reproduces the recorded state digest (if present).
pub struct Replay<'p, P: Program> {
    program: &'p P,
    policy: ReplayPolicy,
    state: P::State,
    last_sequence: u64,
    applied: u64,
}

impl<'p, P: Program> Replay<'p, P> {
    /// Start from `state` as of `base_sequence` (0 for the initial state).
    pub fn new(program: &'p P, state: P::State, base_sequence: u64, policy: ReplayPolicy) -> Self {
        Self {
            program,
            policy,
            state,
            last_sequence: base_sequence,
            applied: 0,
        }
    }

    pub fn from_initial(program: &'p P, policy: ReplayPolicy) -> Self {
        Self::new(program, program.initial_state(), 0, policy)
    }

    pub fn apply(&mut self, record: &TransitionRecord) -> KernelResult<()> {
        let expected = self.last_sequence + 1;
        if record.sequence != expected {
            return Err(KernelError::SequenceGap {
                expected,
                found: record.sequence,
            });
        }

        let transition = self.program.apply(&self.state, &record.request);

        if self.policy.verify_responses && transition.response != record.response {
            return Err(KernelError::NonDeterministic {
                sequence: record.sequence,
            });
        }

        if let Some(expected_digest) = record.state_digest {
            if state_digest(&transition.state)? != expected_digest {
                return Err(KernelError::DigestMismatch {
                    sequence: record.sequence,
                });
            }
        }

        self.state = transition.state;
        self.last_sequence = record.sequence;
        self.applied += 1;
        Ok(())
    }

    pub fn state(&self) -> &P::State {
        &self.state
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Number of records applied by this replay.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn finish(self) -> (P::State, u64) {
        (self.state, self.last_sequence)
    }
}

/// Replays `records` from the program's initial state.
pub fn replay_from_initial<'r, P, I>(
    program: &P,
    records: I,
    policy: ReplayPolicy,
) -> KernelResult<(P::State, u64)>
where
    P: Program,
    I: IntoIterator<Item = &'r TransitionRecord>,
{
    let mut replay = Replay::from_initial(program, policy);
    for record in records {
        replay.apply(record)?;
    }
    Ok(replay.finish())
}
