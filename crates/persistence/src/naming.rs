//! Store entry names.
//!
//! Sequence numbers are zero-padded to 20 digits (the width of `u64::MAX`)
//! so lexical order of names is numeric order of sequences.

pub const RECORD_PREFIX: &str = "log/";
pub const RECORD_SUFFIX: &str = ".rec";
pub const SNAPSHOT_PREFIX: &str = "snapshots/";
pub const SNAPSHOT_SUFFIX: &str = ".snap";

pub fn record_name(sequence: u64) -> String {
    format!("{}{:020}{}", RECORD_PREFIX, sequence, RECORD_SUFFIX)
}

pub fn snapshot_name(sequence: u64) -> String {
    format!("{}{:020}{}", SNAPSHOT_PREFIX, sequence, SNAPSHOT_SUFFIX)
}

pub fn parse_record_name(name: &str) -> Option<u64> {
    parse(name, RECORD_PREFIX, RECORD_SUFFIX)
}

pub fn parse_snapshot_name(name: &str) -> Option<u64> {
    parse(name, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX)
}

fn parse(name: &str, prefix: &str, suffix: &str) -> Option<u64> {
    let digits = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.len() != 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
