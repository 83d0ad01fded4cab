// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! The Program Contract
//!
//! A program is the compiled application hosted by the node. The engine
//! treats it as a black box with one obligation: `apply` is a pure function
//! of `(state, request)`.
//!
//! # Determinism Requirements
//! - No clocks, randomness or I/O inside `apply`
//! - Same state + same request => same new state and same response
//! - Anything non-deterministic must live outside `State`

use crate::types::{RequestDescriptor, ResponseDescriptor};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Result of applying one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    pub state: S,
    pub response: ResponseDescriptor,
}

impl<S> Transition<S> {
    pub fn new(state: S, response: ResponseDescriptor) -> Self {
        Self { state, response }
    }
}

pub trait Program {
    /// Opaque application state. Serialized into snapshots and digests,
    /// so its encoding must be canonical (prefer `BTreeMap` over `HashMap`).
    type State: Clone + PartialEq + Serialize + DeserializeOwned;

    /// State used when no snapshot and no log exist.
    fn initial_state(&self) -> Self::State;

    fn apply(&self, state: &Self::State, request: &RequestDescriptor) -> Transition<Self::State>;
}
