// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{validate_name, DurableStore, RetryPolicy, StoreError};
use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// In-memory Durable Store with write fault injection.
///
/// Injected failures hit individual write *attempts*, before the retry
/// policy sees them, so tests exercise the same backoff path as a real
/// disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    faults: Mutex<Option<Fault>>,
    retry: RetryPolicy,
    write_attempts: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    kind: io::ErrorKind,
    /// `None` fails every attempt until cleared.
    remaining: Option<u32>,
}

impl MemoryStore {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }

    /// The next `times` write attempts fail with `kind`.
    pub fn inject_failures(&self, kind: io::ErrorKind, times: u32) {
        *lock(&self.faults) = Some(Fault {
            kind,
            remaining: Some(times),
        });
    }

    /// Every write attempt fails with `kind` until [`clear_failures`](Self::clear_failures).
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        *lock(&self.faults) = Some(Fault { kind, remaining: None });
    }

    pub fn clear_failures(&self) {
        *lock(&self.faults) = None;
    }

    /// Write attempts seen so far, including failed and retried ones.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Flips the last byte of an entry in place.
    pub fn corrupt(&self, name: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        let bytes = entries
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        if let Some(last) = bytes.last_mut() {
            *last ^= 0x01;
        }
        Ok(())
    }

    fn next_fault(&self) -> Option<io::Error> {
        let mut faults = lock(&self.faults);
        let fault = (*faults)?;
        match fault.remaining {
            None => Some(io::Error::new(fault.kind, "injected failure")),
            Some(0) => {
                *faults = None;
                None
            }
            Some(n) => {
                *faults = if n > 1 {
                    Some(Fault {
                        remaining: Some(n - 1),
                        ..fault
                    })
                } else {
                    None
                };
                Some(io::Error::new(fault.kind, "injected failure"))
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DurableStore for MemoryStore {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_name(name)?;
        self.retry.run("write", name, || {
            self.write_attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.next_fault() {
                return Err(err);
            }
            lock(&self.entries).insert(name.to_string(), bytes.to_vec());
            Ok(())
        })
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(name)?;
        self.retry.run("read", name, || {
            lock(&self.entries)
                .get(name)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = lock(&self.entries);
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        lock(&self.entries).remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryOptions;

    fn store(attempts: u32) -> MemoryStore {
        MemoryStore::new(RetryPolicy::new(RetryOptions::immediate(attempts)))
    }

    #[test]
    fn test_transient_failures_below_attempts_succeed() {
        let store = store(3);
        store.inject_failures(io::ErrorKind::TimedOut, 2);
        store.write("log/a", b"x").unwrap();
        assert_eq!(store.write_attempts(), 3);
        assert_eq!(store.read("log/a").unwrap(), b"x");
    }

    #[test]
    fn test_transient_failures_at_attempts_exhaust() {
        let store = store(3);
        store.inject_failures(io::ErrorKind::TimedOut, 3);
        assert!(matches!(
            store.write("log/a", b"x"),
            Err(StoreError::Exhausted { attempts: 3, .. })
        ));
        assert!(matches!(store.read("log/a"), Err(StoreError::NotFound(_))));

        // The fault is used up; the store works again.
        store.write("log/a", b"x").unwrap();
    }

    #[test]
    fn test_permanent_failure_until_cleared() {
        let store = store(2);
        store.fail_writes(io::ErrorKind::Other);
        assert!(store.write("log/a", b"x").is_err());
        assert!(store.write("log/a", b"x").is_err());
        store.clear_failures();
        store.write("log/a", b"x").unwrap();
    }

    #[test]
    fn test_list_prefix() {
        let store = store(1);
        store.write("log/2", b"").unwrap();
        store.write("log/1", b"").unwrap();
        store.write("logs", b"").unwrap();
        store.write("snapshots/1", b"").unwrap();
        assert_eq!(store.list("log/").unwrap(), vec!["log/1", "log/2"]);
    }
}
