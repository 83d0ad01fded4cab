// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{validate_name, DurableStore, RetryPolicy, StoreError, TMP_SUFFIX};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Durable Store over a local directory. Entry `a/b` lives at `<root>/a/b`.
///
/// Writes go to `<path>.tmp`, are fsync'd, then renamed over the target, so
/// a reader sees either the old entry or the complete new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    retry: RetryPolicy,
}

impl FileStore {
    /// Creates `root` if needed and removes `*.tmp` leftovers of writes that
    /// were interrupted by a crash.
    pub fn open(root: impl Into<PathBuf>, retry: RetryPolicy) -> Result<Self, StoreError> {
        let root = root.into();
        let label = root.display().to_string();

        retry.run("open", &label, || fs::create_dir_all(&root))?;
        let removed = retry.run("open", &label, || sweep_tmp(&root))?;
        if removed > 0 {
            tracing::warn!("Removed {} incomplete writes under {:?}", removed, root);
        }

        Ok(Self { root, retry })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl DurableStore for FileStore {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        self.retry.run("write", name, || write_atomic(&path, bytes))
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        self.retry.run("read", name, || fs::read(&path))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let (dir, file_prefix) = match prefix.rfind('/') {
            Some(idx) => (&prefix[..=idx], &prefix[idx + 1..]),
            None => ("", prefix),
        };
        let dir_path = if dir.is_empty() {
            self.root.clone()
        } else {
            let dir_name = dir.trim_end_matches('/');
            validate_name(dir_name)?;
            self.path_of(dir_name)
        };

        self.retry.run("list", prefix, || {
            let entries = match fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            let mut names = Vec::new();
            for entry in entries {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                    continue;
                };
                if file_name.starts_with(file_prefix) && !file_name.ends_with(TMP_SUFFIX) {
                    names.push(format!("{}{}", dir, file_name));
                }
            }
            names.sort();
            Ok(names)
        })
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_of(name);
        self.retry.run("remove", name, || match fs::remove_file(&path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    fs::create_dir_all(parent)?;

    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn sweep_tmp(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            removed += sweep_tmp(&path)?;
        } else if path.to_string_lossy().ends_with(TMP_SUFFIX) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
