//! Data-directory fixtures for tests and demos.
//!
//! Writes entries with the same layout `FileStore` uses: `<root>/<name>`
//! where names come from `naming`.

use crate::error::Result;
use crate::naming::{record_name, snapshot_name};
use crate::record::encode_record;
use crate::snapshot::encode_snapshot;
use statehost_kernel::{RequestDescriptor, ResponseDescriptor, Snapshot, SnapshotFormat, TransitionRecord};

use std::fs;
use std::path::{Path, PathBuf};

pub struct FixturePaths {
    pub root: PathBuf,
    pub records: Vec<PathBuf>,
    pub snapshots: Vec<PathBuf>,
}

pub fn write_entry(root: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;
    Ok(path)
}

/// Record `n` of a counter run: `POST /counter/increment` answered with `n`.
pub fn counter_record(sequence: u64) -> TransitionRecord {
    TransitionRecord::new(
        sequence,
        1_700_000_000_000 + sequence * 1_000,
        RequestDescriptor::new("POST", "/counter/increment"),
        ResponseDescriptor::ok(sequence.to_string()),
    )
}

/// A data directory holding `records` counter records and a JSON snapshot
/// (`{"count":S}`) at each sequence in `snapshot_at`.
pub fn generate_counter_scenario(root: &Path, records: u64, snapshot_at: &[u64]) -> Result<FixturePaths> {
    fs::create_dir_all(root)?;

    let mut record_paths = Vec::new();
    for sequence in 1..=records {
        let bytes = encode_record(&counter_record(sequence))?;
        record_paths.push(write_entry(root, &record_name(sequence), &bytes)?);
    }

    let mut snapshot_paths = Vec::new();
    for &sequence in snapshot_at {
        let snapshot = Snapshot {
            sequence,
            timestamp_ms: 1_700_000_000_000 + sequence * 1_000,
            format: SnapshotFormat::Json,
            state: format!(r#"{{"count":{}}}"#, sequence).into_bytes(),
        };
        let bytes = encode_snapshot(&snapshot)?;
        snapshot_paths.push(write_entry(root, &snapshot_name(sequence), &bytes)?);
    }

    Ok(FixturePaths {
        root: root.to_path_buf(),
        records: record_paths,
        snapshots: snapshot_paths,
    })
}

/// Flips one bit near the end of the entry at `path`.
pub fn corrupt_entry(path: &Path) -> Result<()> {
    let mut data = fs::read(path)?;
    if let Some(last) = data.last_mut() {
        *last ^= 0x01;
    }
    fs::write(path, data)?;
    Ok(())
}
