use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid magic bytes in header")]
    InvalidMagic,
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch: expected {expected:016x}, found {found:016x}")]
    ChecksumMismatch {
        expected: u64,
        found: u64,
    },
    #[error("Truncated entry: header claims {expected} payload bytes, found {found}")]
    Truncated {
        expected: u64,
        found: u64,
    },
    #[error("Sequence mismatch: frame says {frame}, payload says {payload}")]
    SequenceMismatch {
        frame: u64,
        payload: u64,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
