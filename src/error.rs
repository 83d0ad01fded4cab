//! Error types.

use alloc::string::String;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// State or record could not be serialized.
    Encode(String),
    /// Bytes could not be turned back into a value.
    Decode(String),
    /// Replay saw a record out of order.
    SequenceGap { expected: u64, found: u64 },
    /// Recomputed response differs from the recorded one.
    NonDeterministic { sequence: u64 },
    /// Recomputed state digest differs from the recorded one.
    DigestMismatch { sequence: u64 },
    /// Unknown snapshot format tag or name.
    UnknownFormat(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Encode(msg) => write!(f, "encode failed: {}", msg),
            KernelError::Decode(msg) => write!(f, "decode failed: {}", msg),
            KernelError::SequenceGap { expected, found } => {
                write!(f, "sequence gap: expected record {}, found {}", expected, found)
            }
            KernelError::NonDeterministic { sequence } => write!(
                f,
                "transition function is not deterministic: response for record {} differs from the recorded one",
                sequence
            ),
            KernelError::DigestMismatch { sequence } => {
                write!(f, "state digest mismatch after record {}", sequence)
            }
            KernelError::UnknownFormat(name) => write!(f, "unknown snapshot format: {}", name),
        }
    }
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;

impl core::error::Error for KernelError {}
