use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use crate::layout::DataDir;
use statehost_kernel::TransitionRecord;
use statehost_persistence::decode_record;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    pub sequence: u64,
    pub time: String,
    pub method: String,
    pub uri: String,
    pub status: String,
}

impl TimelineRow {
    fn from_record(record: &TransitionRecord) -> Self {
        Self {
            sequence: record.sequence,
            time: format_millis(record.timestamp_ms),
            method: record.request.method.clone(),
            uri: record.request.uri.clone(),
            status: record.response.status.to_string(),
        }
    }
}

/// Rows for records with sequence >= `from`, at most `limit` of them.
/// Unreadable records appear with status `CORRUPT` instead of aborting.
pub fn collect(dir: &Path, from: u64, limit: Option<usize>) -> anyhow::Result<Vec<TimelineRow>> {
    let data = DataDir::open(dir)?;
    let mut rows = Vec::new();

    for entry in data.records()?.into_iter().filter(|e| e.sequence >= from) {
        if limit.map_or(false, |l| rows.len() >= l) {
            break;
        }
        let row = match fs::read(&entry.path).map_err(anyhow::Error::from).and_then(|b| Ok(decode_record(&b)?)) {
            Ok(record) => TimelineRow::from_record(&record),
            Err(e) => TimelineRow {
                sequence: entry.sequence,
                time: String::new(),
                method: String::new(),
                uri: e.to_string(),
                status: "CORRUPT".to_string(),
            },
        };
        rows.push(row);
    }
    Ok(rows)
}

pub fn run(dir: &Path, from: u64, limit: Option<usize>) -> anyhow::Result<()> {
    let rows = collect(dir, from, limit)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Seq", "Time", "Method", "URI", "Status"]);

    for row in rows {
        table.add_row(vec![
            row.sequence.to_string(),
            row.time,
            row.method,
            row.uri,
            row.status,
        ]);
    }

    println!("\nEvent Timeline\n");
    println!("{table}\n");

    Ok(())
}

fn format_millis(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
