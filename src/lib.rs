// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![no_std]

//! statehost-kernel: the deterministic, no_std core of the statehost engine.
//!
//! Everything in here is pure: request/response descriptors, the `Program`
//! contract, transition records, snapshot state codecs and replay. Storage,
//! time and threads live in `statehost-node`.

extern crate alloc;

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod error;
pub mod types;
pub mod program;
pub mod event;
pub mod snapshot;
pub mod replay;

pub use error::{KernelError, KernelResult};
pub use event::TransitionRecord;
pub use program::{Program, Transition};
pub use replay::{Replay, ReplayPolicy};
pub use snapshot::{Snapshot, SnapshotFormat};
pub use types::{Header, RequestDescriptor, ResponseDescriptor};

#[cfg(test)]
pub mod tests;
