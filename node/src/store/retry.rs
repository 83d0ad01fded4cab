// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::config::RetryOptions;
use crate::errors::StoreError;
use std::io;
use std::time::Duration;

/// Exponential backoff around a fallible store operation.
///
/// Attempt `k` (1-based) that fails transiently is followed by a sleep of
/// `min(initial_delay * 2^(k-1), max_delay)`. Sleeping blocks the calling
/// thread, which is the processor's own thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    options: RetryOptions,
}

impl RetryPolicy {
    pub fn new(options: RetryOptions) -> Self {
        Self {
            options: RetryOptions {
                max_attempts: options.max_attempts.max(1),
                ..options
            },
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.options.max_attempts
    }

    /// Delay after the `attempt`-th failure.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.options
            .initial_delay
            .checked_mul(1u32 << shift)
            .unwrap_or(self.options.max_delay)
            .min(self.options.max_delay)
    }

    pub fn run<T, F>(&self, operation: &'static str, name: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> io::Result<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.kind() == io::ErrorKind::NotFound && operation == "read" => {
                    return Err(StoreError::NotFound(name.to_string()));
                }
                Err(e) if !is_transient(&e) => {
                    return Err(StoreError::Io {
                        operation,
                        name: name.to_string(),
                        source: e,
                    });
                }
                Err(e) if attempt >= self.options.max_attempts => {
                    tracing::error!(operation, name, attempt, "store operation exhausted retries: {}", e);
                    return Err(StoreError::Exhausted {
                        operation,
                        name: name.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(operation, name, attempt, ?delay, "transient store failure, retrying: {}", e);
                    metrics::counter!("statehost_store_retries_total", 1);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

/// Errors that retrying cannot fix fail fast.
pub fn is_transient(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidData
            | io::ErrorKind::AlreadyExists
            | io::ErrorKind::Unsupported
    )
}
