use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::layout::DataDir;
use statehost_persistence::{decode_snapshot, snapshot::SnapshotHeader};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub first_sequence: Option<u64>,
    pub last_sequence: Option<u64>,
    pub snapshots: Vec<u64>,
    /// Newest snapshot whose checksum is valid.
    pub latest_valid_snapshot: Option<u64>,
    pub temp_files: usize,
}

impl Summary {
    /// Records a recovery would replay on top of the latest valid snapshot.
    pub fn replay_length(&self) -> u64 {
        match self.last_sequence {
            Some(last) => last.saturating_sub(self.latest_valid_snapshot.unwrap_or(0)),
            None => 0,
        }
    }
}

pub fn summarize(dir: &Path) -> anyhow::Result<Summary> {
    let data = DataDir::open(dir)?;
    let records = data.records()?;
    let snapshots = data.snapshots()?;

    let latest_valid_snapshot = snapshots
        .iter()
        .rev()
        .find(|entry| {
            fs::read(&entry.path)
                .ok()
                .and_then(|bytes| decode_snapshot(&bytes).ok())
                .map_or(false, |s| s.sequence == entry.sequence)
        })
        .map(|entry| entry.sequence);

    Ok(Summary {
        records: records.len(),
        first_sequence: records.first().map(|e| e.sequence),
        last_sequence: records.last().map(|e| e.sequence),
        snapshots: snapshots.iter().map(|e| e.sequence).collect(),
        latest_valid_snapshot,
        temp_files: data.temp_files()?,
    })
}

pub fn run(dir: &Path) -> anyhow::Result<()> {
    let data = DataDir::open(dir)?;
    let summary = summarize(data.root())?;

    println!("\nstatehost data directory: {}", data.root().display());
    println!("--------------------------");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Item", "Status", "Details"]);

    match (summary.first_sequence, summary.last_sequence) {
        (Some(first), Some(last)) => {
            table.add_row(vec![
                "Event log".to_string(),
                "FOUND".to_string(),
                format!("{} records, sequences {}..={}", summary.records, first, last),
            ]);
        }
        _ => {
            table.add_row(vec!["Event log", "EMPTY", ""]);
        }
    }

    match summary.snapshots.last() {
        Some(&newest) => {
            let details = latest_header(&data, newest)
                .map(|h| {
                    format!(
                        "{} stored, newest {} ({} bytes, {})",
                        summary.snapshots.len(),
                        newest,
                        h.body_len,
                        h.snapshot_format().map(|f| f.to_string()).unwrap_or_else(|_| "unknown format".into())
                    )
                })
                .unwrap_or_else(|| format!("{} stored, newest {} (unreadable header)", summary.snapshots.len(), newest));
            let status = if summary.latest_valid_snapshot == Some(newest) { "FOUND" } else { "CORRUPT" };
            table.add_row(vec!["Snapshots".to_string(), status.to_string(), details]);
        }
        None => {
            table.add_row(vec!["Snapshots", "MISSING", ""]);
        }
    }

    table.add_row(vec![
        "Recovery".to_string(),
        "ESTIMATE".to_string(),
        format!(
            "base {}, replay {} records",
            summary
                .latest_valid_snapshot
                .map(|s| format!("snapshot {}", s))
                .unwrap_or_else(|| "initial state".into()),
            summary.replay_length()
        ),
    ]);

    if summary.temp_files > 0 {
        table.add_row(vec![
            "Temp files".to_string(),
            "STALE".to_string(),
            format!("{} interrupted writes (removed on next start)", summary.temp_files),
        ]);
    }

    println!("{table}\n");
    Ok(())
}

fn latest_header(data: &DataDir, sequence: u64) -> Option<SnapshotHeader> {
    let path = data.root().join(statehost_persistence::naming::snapshot_name(sequence));
    let bytes = fs::read(path).ok()?;
    SnapshotHeader::read_from(&bytes[..]).ok()
}
