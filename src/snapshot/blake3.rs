// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical BLAKE3 state digests.
//!
//! The digest input is the bincode (standard config) encoding of the state,
//! independent of the snapshot format in use. Two states with the same
//! digest are treated as the same state during replay verification.

use crate::error::{KernelError, KernelResult};
use alloc::string::ToString;
use serde::Serialize;

pub fn state_digest<T: Serialize>(state: &T) -> KernelResult<[u8; 32]> {
    let bytes = bincode::serde::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| KernelError::Encode(e.to_string()))?;
    Ok(blake3::hash(&bytes).into())
}

/// Lower-case hex rendering used in logs and the CLI.
pub fn to_hex(digest: &[u8]) -> alloc::string::String {
    use core::fmt::Write;
    let mut out = alloc::string::String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
