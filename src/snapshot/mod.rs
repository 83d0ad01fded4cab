// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Snapshots of program state.
//!
//! A snapshot at sequence S holds the state obtained by applying records
//! 1..=S to the initial state. The state bytes are produced by one of the
//! `SnapshotFormat` codecs; the format travels with the snapshot so a store
//! can hold snapshots written under different settings.

pub mod format;
pub mod blake3;

pub use format::SnapshotFormat;

use alloc::vec::Vec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub format: SnapshotFormat,
    pub state: Vec<u8>,
}

impl Snapshot {
    pub fn decode_state<T: serde::de::DeserializeOwned>(&self) -> crate::KernelResult<T> {
        self.format.decode(&self.state)
    }
}
