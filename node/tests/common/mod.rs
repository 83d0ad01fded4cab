// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use statehost_kernel::{Program, RequestDescriptor, ResponseDescriptor, Transition};
use statehost_node::config::{EngineOptions, RetryOptions, SnapshotPolicy};
use statehost_node::store::{FileStore, MemoryStore, RetryPolicy};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub type CounterState = BTreeMap<String, u64>;

/// Starts from `{}`; `POST /counter/increment` bumps `count` and answers
/// with the new value.
pub struct CounterProgram;

impl Program for CounterProgram {
    type State = CounterState;

    fn initial_state(&self) -> CounterState {
        BTreeMap::new()
    }

    fn apply(&self, state: &CounterState, request: &RequestDescriptor) -> Transition<CounterState> {
        match (request.method.as_str(), request.path()) {
            ("POST", "/counter/increment") => {
                let mut next = state.clone();
                let count = next.entry("count".to_string()).or_insert(0);
                *count += 1;
                let body = count.to_string();
                Transition::new(next, ResponseDescriptor::ok(body))
            }
            _ => Transition::new(state.clone(), ResponseDescriptor::not_found()),
        }
    }
}

pub fn increment() -> RequestDescriptor {
    RequestDescriptor::new("POST", "/counter/increment")
}

pub fn count(n: u64) -> CounterState {
    BTreeMap::from([("count".to_string(), n)])
}

pub fn options(snapshot: SnapshotPolicy) -> EngineOptions {
    EngineOptions {
        snapshot,
        ..EngineOptions::default()
    }
}

pub fn retry(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(RetryOptions::immediate(attempts))
}

pub fn file_store(root: &Path) -> Arc<FileStore> {
    Arc::new(FileStore::open(root, retry(3)).unwrap())
}

pub fn memory_store(attempts: u32) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(retry(attempts)))
}
