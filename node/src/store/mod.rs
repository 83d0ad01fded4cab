// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable Store.
//!
//! Named blobs under a root. Names are `/`-separated relative paths
//! (`log/00000000000000000001.rec`). Every operation goes through a
//! [`RetryPolicy`], so transient failures only surface once the attempts
//! are exhausted.

pub mod file;
pub mod memory;
pub mod retry;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use retry::RetryPolicy;

pub use crate::errors::StoreError;

pub trait DurableStore: Send + Sync {
    /// Atomically replaces the entry `name` with `bytes`.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// `StoreError::NotFound` if the entry does not exist.
    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// Names starting with `prefix`, in ascending order.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Removing a missing entry is not an error.
    fn remove(&self, name: &str) -> Result<(), StoreError>;
}

/// Suffix of in-flight writes. Never a valid entry name.
pub const TMP_SUFFIX: &str = ".tmp";

pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('/')
        && !name.contains('\\')
        && !name.ends_with(TMP_SUFFIX)
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("log/00000000000000000001.rec").is_ok());
        assert!(validate_name("top-level").is_ok());

        for bad in ["", "/abs", "log//x", "../escape", "log/./x", "a\\b", "log/x.tmp", "log/"] {
            assert!(
                matches!(validate_name(bad), Err(StoreError::InvalidName(_))),
                "{bad:?} accepted"
            );
        }
    }
}
