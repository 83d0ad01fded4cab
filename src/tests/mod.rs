// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod snapshot_tests;
pub mod replay_tests;
pub mod determinism_tests;

use crate::program::{Program, Transition};
use crate::types::{RequestDescriptor, ResponseDescriptor};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Counts hits per path. `POST /<name>` increments `<name>`, `GET /<name>`
/// reads it.
pub struct TallyProgram;

impl Program for TallyProgram {
    type State = BTreeMap<String, u64>;

    fn initial_state(&self) -> Self::State {
        BTreeMap::new()
    }

    fn apply(&self, state: &Self::State, request: &RequestDescriptor) -> Transition<Self::State> {
        let key = request.path().trim_start_matches('/').to_string();
        match request.method.as_str() {
            "POST" => {
                let mut next = state.clone();
                let count = next.entry(key).or_insert(0);
                *count += 1;
                let body = count.to_string();
                Transition::new(next, ResponseDescriptor::ok(body))
            }
            _ => {
                let count = state.get(&key).copied().unwrap_or(0);
                Transition::new(state.clone(), ResponseDescriptor::ok(count.to_string()))
            }
        }
    }
}

/// Builds records by running `requests` through `TallyProgram`.
pub fn record_run(requests: &[RequestDescriptor]) -> alloc::vec::Vec<crate::event::TransitionRecord> {
    let program = TallyProgram;
    let mut state = program.initial_state();
    let mut records = alloc::vec::Vec::new();
    for (i, request) in requests.iter().enumerate() {
        let transition = program.apply(&state, request);
        records.push(crate::event::TransitionRecord::new(
            i as u64 + 1,
            1_000 + i as u64,
            request.clone(),
            transition.response,
        ));
        state = transition.state;
    }
    records
}
