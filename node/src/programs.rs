// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Built-in program served by the `statehost-node` binary.

use serde::{Deserialize, Serialize};
use statehost_kernel::{Program, RequestDescriptor, ResponseDescriptor, Transition};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueState {
    pub entries: BTreeMap<String, String>,
    pub counter: u64,
}

/// A string key-value store plus a counter.
///
/// | Request | Effect |
/// |---|---|
/// | `GET /kv/{key}` | value, or 404 |
/// | `PUT /kv/{key}` | stores the UTF-8 body |
/// | `DELETE /kv/{key}` | removes the key, or 404 |
/// | `POST /counter/increment` | adds one, returns the new value |
/// | `GET /counter` | current value |
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyValueProgram;

impl Program for KeyValueProgram {
    type State = KeyValueState;

    fn initial_state(&self) -> KeyValueState {
        KeyValueState::default()
    }

    fn apply(&self, state: &KeyValueState, request: &RequestDescriptor) -> Transition<KeyValueState> {
        let path = request.path();
        let unchanged = |response| Transition::new(state.clone(), response);

        if let Some(key) = path.strip_prefix("/kv/").filter(|k| !k.is_empty()) {
            return match request.method.as_str() {
                "GET" => match state.entries.get(key) {
                    Some(value) => unchanged(ResponseDescriptor::ok(value.clone())),
                    None => unchanged(ResponseDescriptor::not_found()),
                },
                "PUT" => match std::str::from_utf8(&request.body) {
                    Ok(value) => {
                        let mut next = state.clone();
                        let created = next.entries.insert(key.to_string(), value.to_string()).is_none();
                        let status = if created { 201 } else { 200 };
                        Transition::new(next, ResponseDescriptor::text(status, "stored"))
                    }
                    Err(_) => unchanged(ResponseDescriptor::text(400, "value must be UTF-8")),
                },
                "DELETE" => {
                    let mut next = state.clone();
                    match next.entries.remove(key) {
                        Some(_) => Transition::new(next, ResponseDescriptor::ok("deleted")),
                        None => unchanged(ResponseDescriptor::not_found()),
                    }
                }
                _ => unchanged(ResponseDescriptor::not_found()),
            };
        }

        match (request.method.as_str(), path) {
            ("POST", "/counter/increment") => {
                let mut next = state.clone();
                next.counter += 1;
                let body = next.counter.to_string();
                Transition::new(next, ResponseDescriptor::ok(body))
            }
            ("GET", "/counter") => unchanged(ResponseDescriptor::ok(state.counter.to_string())),
            _ => unchanged(ResponseDescriptor::not_found()),
        }
    }
}
