// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use statehost_kernel::KernelError;
use statehost_persistence::PersistenceError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("entry not found: {0}")]
    NotFound(String),
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
    #[error("{operation} {name} failed after {attempts} attempts: {source}")]
    Exhausted {
        operation: &'static str,
        name: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("{operation} {name} failed: {source}")]
    Io {
        operation: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode record {sequence}: {source}")]
    Encode {
        sequence: u64,
        #[source]
        source: PersistenceError,
    },
    #[error("corrupt log entry {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: PersistenceError,
    },
    #[error("log entry {name} holds record {found}")]
    NameMismatch { name: String, found: u64 },
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode state at {sequence}: {source}")]
    Encode {
        sequence: u64,
        #[source]
        source: KernelError,
    },
    #[error("failed to frame snapshot {sequence}: {source}")]
    Frame {
        sequence: u64,
        #[source]
        source: PersistenceError,
    },
    #[error("corrupt snapshot {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: PersistenceError,
    },
    #[error("snapshot {name} holds sequence {found}")]
    NameMismatch { name: String, found: u64 },
}

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("failed to list snapshots: {0}")]
    Snapshots(#[source] SnapshotError),
    #[error("failed to read event log: {0}")]
    Log(#[from] EventLogError),
    #[error("replay failed: {0}")]
    Replay(#[source] KernelError),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("recovery failed: {0}")]
    Recovery(#[from] RecoveryError),
    #[error("append failed: {0}")]
    Append(#[from] EventLogError),
    #[error("failed to digest state: {0}")]
    Digest(#[source] KernelError),
}

/// Errors returned to HTTP clients.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("request was not recorded: {0}")]
    Process(#[from] ProcessError),
    #[error("request queue is full")]
    Overloaded,
    #[error("processor is shut down")]
    Unavailable,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::Process(_) | EngineError::Overloaded | EngineError::Unavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

/// Startup failures of the node binary.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("startup failed: {0}")]
    Startup(String),
}
