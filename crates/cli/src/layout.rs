//! Read-only view of a node data directory.

use anyhow::Context;
use statehost_persistence::naming::{parse_record_name, parse_snapshot_name, RECORD_PREFIX, SNAPSHOT_PREFIX};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub sequence: u64,
    pub path: PathBuf,
}

pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record entries ordered by sequence.
    pub fn records(&self) -> anyhow::Result<Vec<Entry>> {
        self.entries(RECORD_PREFIX, parse_record_name)
    }

    /// Snapshot entries ordered by sequence.
    pub fn snapshots(&self) -> anyhow::Result<Vec<Entry>> {
        self.entries(SNAPSHOT_PREFIX, parse_snapshot_name)
    }

    /// Leftovers of interrupted writes.
    pub fn temp_files(&self) -> anyhow::Result<usize> {
        let mut count = 0;
        for prefix in [RECORD_PREFIX, SNAPSHOT_PREFIX] {
            for name in self.file_names(prefix)? {
                if name.ends_with(".tmp") {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    fn entries(&self, prefix: &str, parse: fn(&str) -> Option<u64>) -> anyhow::Result<Vec<Entry>> {
        let dir = self.root.join(prefix.trim_end_matches('/'));
        let mut entries: Vec<Entry> = self
            .file_names(prefix)?
            .into_iter()
            .filter_map(|name| {
                parse(&format!("{}{}", prefix, name)).map(|sequence| Entry {
                    sequence,
                    path: dir.join(&name),
                })
            })
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    fn file_names(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.root.join(prefix.trim_end_matches('/'));
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
