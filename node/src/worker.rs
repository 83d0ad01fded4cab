// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Serialization boundary between async callers and the processor.
//!
//! The processor lives on one dedicated OS thread and takes commands from a
//! bounded channel, so requests are applied one at a time in arrival order.
//! Store retries sleep on that thread, never on the async runtime.

use crate::errors::{EngineError, ProcessError};
use crate::processor::RequestProcessor;
use crate::store::DurableStore;
use statehost_kernel::{Program, RequestDescriptor, ResponseDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

struct Job {
    request: RequestDescriptor,
    reply: oneshot::Sender<Result<ResponseDescriptor, ProcessError>>,
}

enum Command {
    Handle(Job),
    Shutdown,
}

/// Cheap, cloneable entry point used by the HTTP adapter.
#[derive(Clone)]
pub struct ProcessorHandle {
    tx: mpsc::Sender<Command>,
    committed: Arc<AtomicU64>,
}

impl ProcessorHandle {
    /// Queues `request` and waits for its outcome. Once queued, the request
    /// runs to completion even if this future is dropped.
    pub async fn handle(&self, request: RequestDescriptor) -> Result<ResponseDescriptor, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .try_send(Command::Handle(Job { request, reply }))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EngineError::Overloaded,
                mpsc::error::TrySendError::Closed(_) => EngineError::Unavailable,
            })?;

        let outcome = rx.await.map_err(|_| EngineError::Unavailable)?;
        Ok(outcome?)
    }

    /// Last committed sequence. Does not wait for the processor.
    pub fn committed_sequence(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }
}

pub struct ProcessorWorker {
    tx: mpsc::Sender<Command>,
    thread: JoinHandle<()>,
}

impl ProcessorWorker {
    pub fn spawn<P, S>(
        mut processor: RequestProcessor<P, S>,
        queue_depth: usize,
    ) -> std::io::Result<(Self, ProcessorHandle)>
    where
        P: Program + Send + 'static,
        P::State: Send,
        S: DurableStore + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(queue_depth.max(1));
        let committed = processor.committed_sequence();

        let thread = std::thread::Builder::new()
            .name("statehost-processor".into())
            .spawn(move || {
                while let Some(command) = rx.blocking_recv() {
                    match command {
                        Command::Handle(job) => {
                            let outcome = processor.handle(job.request);
                            // The caller may have gone away; the outcome is
                            // already durable either way.
                            let _ = job.reply.send(outcome);
                        }
                        Command::Shutdown => break,
                    }
                }
                tracing::info!(
                    last_sequence = processor.last_sequence(),
                    "Processor stopped"
                );
            })?;

        let handle = ProcessorHandle {
            tx: tx.clone(),
            committed,
        };
        Ok((Self { tx, thread }, handle))
    }

    /// Lets the in-flight request finish, drops anything queued behind the
    /// shutdown marker, and joins the thread.
    pub async fn shutdown(self) {
        if self.tx.send(Command::Shutdown).await.is_err() {
            tracing::warn!("Processor already stopped");
        }
        drop(self.tx);

        let thread = self.thread;
        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::error!("Processor thread panicked"),
            Err(e) => tracing::error!("Failed to join processor thread: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineOptions, RetryOptions};
    use crate::programs::KeyValueProgram;
    use crate::store::{MemoryStore, RetryPolicy};
    use std::future::Future;
    use std::task::Poll;

    fn spawn(store: Arc<MemoryStore>, depth: usize) -> (ProcessorWorker, ProcessorHandle) {
        let processor = RequestProcessor::open(KeyValueProgram, store, EngineOptions::default()).unwrap();
        ProcessorWorker::spawn(processor, depth).unwrap()
    }

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(RetryPolicy::new(RetryOptions::immediate(3))))
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_serialized() {
        let (worker, handle) = spawn(memory(), 64);

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle
                    .handle(RequestDescriptor::new("POST", "/counter/increment"))
                    .await
                    .unwrap()
            }));
        }

        let mut seen = Vec::new();
        for task in tasks {
            let response = task.await.unwrap();
            seen.push(String::from_utf8(response.body).unwrap().parse::<u64>().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
        assert_eq!(handle.committed_sequence(), 20);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_apply_in_submission_order() {
        let (worker, handle) = spawn(memory(), 64);

        // The first poll of `handle` enqueues the request, so polling each
        // call once before awaiting any fixes the submission order.
        let mut pending = Vec::new();
        for _ in 0..20 {
            let mut call = Box::pin(handle.handle(RequestDescriptor::new("POST", "/counter/increment")));
            let first = std::future::poll_fn(|cx| Poll::Ready(call.as_mut().poll(cx))).await;
            pending.push((call, first));
        }

        let mut seen = Vec::new();
        for (call, first) in pending {
            let response = match first {
                Poll::Ready(outcome) => outcome,
                Poll::Pending => call.await,
            }
            .unwrap();
            seen.push(String::from_utf8(response.body).unwrap().parse::<u64>().unwrap());
        }
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_unavailable() {
        let (worker, handle) = spawn(memory(), 4);
        worker.shutdown().await;

        let result = handle.handle(RequestDescriptor::new("GET", "/counter")).await;
        assert!(matches!(result, Err(EngineError::Unavailable)));
    }

    #[tokio::test]
    async fn test_append_failure_reaches_caller() {
        let store = memory();
        let (worker, handle) = spawn(store.clone(), 4);

        store.fail_writes(std::io::ErrorKind::Other);
        let result = handle.handle(RequestDescriptor::new("POST", "/counter/increment")).await;
        assert!(matches!(result, Err(EngineError::Process(ProcessError::Append(_)))));
        assert_eq!(handle.committed_sequence(), 0);

        worker.shutdown().await;
    }
}
