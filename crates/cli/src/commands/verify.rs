use crate::layout::DataDir;
use statehost_kernel::SnapshotFormat;
use statehost_persistence::{decode_record, decode_snapshot};
use std::fs;
use std::path::Path;

#[derive(Debug, Default)]
pub struct VerifyReport {
    pub records_checked: usize,
    pub snapshots_checked: usize,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Checks every record frame, log contiguity, and every snapshot.
///
/// A log that starts after sequence 1 is fine only if a valid snapshot
/// covers the missing prefix.
pub fn verify(dir: &Path) -> anyhow::Result<VerifyReport> {
    let data = DataDir::open(dir)?;
    let mut report = VerifyReport::default();

    let mut previous: Option<u64> = None;
    let mut first: Option<u64> = None;
    let records = data.records()?;
    for entry in &records {
        report.records_checked += 1;
        match fs::read(&entry.path) {
            Ok(bytes) => match decode_record(&bytes) {
                Ok(record) if record.sequence != entry.sequence => report.problems.push(format!(
                    "record {}: entry holds sequence {}",
                    entry.sequence, record.sequence
                )),
                Ok(_) => {}
                Err(e) => report.problems.push(format!("record {}: {}", entry.sequence, e)),
            },
            Err(e) => report.problems.push(format!("record {}: {}", entry.sequence, e)),
        }

        if let Some(prev) = previous {
            if entry.sequence != prev + 1 {
                report
                    .problems
                    .push(format!("gap in log: {} is followed by {}", prev, entry.sequence));
            }
        }
        first.get_or_insert(entry.sequence);
        previous = Some(entry.sequence);
    }

    let mut valid_snapshots = Vec::new();
    for entry in data.snapshots()? {
        report.snapshots_checked += 1;
        let snapshot = match fs::read(&entry.path).map_err(anyhow::Error::from).and_then(|b| Ok(decode_snapshot(&b)?)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                report.problems.push(format!("snapshot {}: {}", entry.sequence, e));
                continue;
            }
        };
        if snapshot.sequence != entry.sequence {
            report.problems.push(format!(
                "snapshot {}: entry holds sequence {}",
                entry.sequence, snapshot.sequence
            ));
            continue;
        }
        // Binary state can only be decoded with the program's own types.
        if snapshot.format == SnapshotFormat::Json {
            if let Err(e) = snapshot.decode_state::<serde_json::Value>() {
                report.problems.push(format!("snapshot {}: {}", entry.sequence, e));
                continue;
            }
        }
        if let Some(last) = previous {
            if snapshot.sequence > last {
                report.problems.push(format!(
                    "snapshot {} is ahead of the log, which ends at {}",
                    snapshot.sequence, last
                ));
            }
        }
        valid_snapshots.push(snapshot.sequence);
    }

    if let Some(first) = first {
        if first > 1 && !valid_snapshots.iter().any(|&s| s + 1 >= first) {
            report.problems.push(format!(
                "log starts at {} and no valid snapshot covers 1..={}",
                first,
                first - 1
            ));
        }
    }

    Ok(report)
}

pub fn run(dir: &Path) -> anyhow::Result<()> {
    let report = verify(dir)?;

    if report.is_clean() {
        println!("\n✅ VERIFIED\n");
        println!("Records:    {}", report.records_checked);
        println!("Snapshots:  {}", report.snapshots_checked);
        println!("Confidence: STRONG (CRC64 per entry)\n");
        Ok(())
    } else {
        println!("\n❌ CORRUPTED\n");
        for problem in &report.problems {
            println!("  - {}", problem);
        }
        anyhow::bail!("{} problem(s) found", report.problems.len())
    }
}
