// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Simple Crash Recovery Demo
//!
//! Applies a few requests, "crashes" by dropping the processor mid-run
//! (leaving a torn temp file behind), and recovers from snapshot + log.

use statehost_kernel::RequestDescriptor;
use statehost_node::config::{EngineOptions, RetryOptions, SnapshotPolicy};
use statehost_node::processor::RequestProcessor;
use statehost_node::programs::KeyValueProgram;
use statehost_node::store::{FileStore, RetryPolicy};
use std::sync::Arc;
use tempfile::tempdir;

fn main() {
    println!("\n╔════════════════════════════════════════╗");
    println!("║  statehost Crash Recovery Demo         ║");
    println!("╚════════════════════════════════════════╝\n");

    let dir = tempdir().unwrap();
    let retry = RetryPolicy::new(RetryOptions::default());
    let options = EngineOptions {
        snapshot: SnapshotPolicy::every(3),
        ..EngineOptions::default()
    };

    // Phase 1: apply requests
    {
        let store = Arc::new(FileStore::open(dir.path(), retry).unwrap());
        let mut processor = RequestProcessor::open(KeyValueProgram, store, options).unwrap();
        for i in 0..5 {
            let put = RequestDescriptor::new("PUT", format!("/kv/item{}", i)).with_body(format!("value {}", i));
            processor.handle(put).unwrap();
        }
        processor.handle(RequestDescriptor::new("POST", "/counter/increment")).unwrap();
        println!("Applied {} requests, last snapshot at {}", processor.last_sequence(), processor.last_snapshot());
    }

    // Phase 2: crash mid-write
    let torn = dir.path().join("log").join("00000000000000000007.rec.tmp");
    std::fs::write(&torn, b"SHRC").unwrap();
    println!("Simulated crash, torn write left at {:?}", torn);

    // Phase 3: recover
    let store = Arc::new(FileStore::open(dir.path(), retry).unwrap());
    let mut processor = RequestProcessor::open(KeyValueProgram, store, options).unwrap();
    println!(
        "Recovered: sequence {}, {} keys, counter {}",
        processor.last_sequence(),
        processor.state().entries.len(),
        processor.state().counter
    );

    let response = processor.handle(RequestDescriptor::new("GET", "/kv/item4")).unwrap();
    println!("GET /kv/item4 -> {} {}", response.status, String::from_utf8_lossy(&response.body));
    assert_eq!(processor.last_sequence(), 7);
    println!("\nDone.");
}
