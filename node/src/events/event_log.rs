// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log
//!
//! One store entry per record. `append` allocates the next sequence number
//! only once the store reports the entry durable; `read_from` lists entry
//! names up front and decodes records lazily, one store read per item.

use super::unix_millis;
use crate::errors::EventLogError;
use crate::store::DurableStore;
use statehost_kernel::{RequestDescriptor, ResponseDescriptor, TransitionRecord};
use statehost_persistence::naming::{parse_record_name, record_name, RECORD_PREFIX};
use statehost_persistence::{decode_record, encode_record};
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, EventLogError>;

/// A record together with the size of its encoded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub record: TransitionRecord,
    pub encoded_len: u64,
}

pub struct EventLog<S: DurableStore> {
    store: Arc<S>,
    last_sequence: u64,
}

impl<S: DurableStore> EventLog<S> {
    /// A log positioned at sequence 0. Call [`resume`](Self::resume) with
    /// the recovered sequence before appending to a non-empty store.
    pub fn open(store: Arc<S>) -> Self {
        Self {
            store,
            last_sequence: 0,
        }
    }

    pub fn resume(&mut self, last_sequence: u64) {
        self.last_sequence = last_sequence;
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn next_sequence(&self) -> u64 {
        self.last_sequence + 1
    }

    /// Durably records one transition under the next sequence number.
    ///
    /// On failure the sequence number is not consumed: the next append
    /// reuses it.
    pub fn append(
        &mut self,
        request: RequestDescriptor,
        response: ResponseDescriptor,
        state_digest: Option<[u8; 32]>,
    ) -> Result<LogEntry> {
        let sequence = self.next_sequence();
        let mut record = TransitionRecord::new(sequence, unix_millis(), request, response);
        if let Some(digest) = state_digest {
            record = record.with_state_digest(digest);
        }

        let encoded = encode_record(&record).map_err(|source| EventLogError::Encode { sequence, source })?;
        let name = record_name(sequence);

        if let Err(e) = self.store.write(&name, &encoded) {
            // A write reported as failed may still have landed. It must not
            // be replayed for a request that was answered with an error.
            if let Err(cleanup) = self.store.remove(&name) {
                tracing::warn!("Could not remove {} after failed append: {}", name, cleanup);
            }
            return Err(e.into());
        }

        self.last_sequence = sequence;
        Ok(LogEntry {
            record,
            encoded_len: encoded.len() as u64,
        })
    }

    /// Records with sequence >= `from`, in order. Calling this again
    /// restarts the iteration.
    pub fn read_from(&self, from: u64) -> Result<RecordIter<'_, S>> {
        let names = self
            .entries()?
            .into_iter()
            .filter(|(sequence, _)| *sequence >= from)
            .collect::<Vec<_>>();

        Ok(RecordIter {
            store: &self.store,
            names: names.into_iter(),
        })
    }

    /// Sequence numbers present in the store, ascending.
    pub fn sequences(&self) -> Result<Vec<u64>> {
        Ok(self.entries()?.into_iter().map(|(sequence, _)| sequence).collect())
    }

    /// Removes every record with sequence <= `through`. Returns how many
    /// entries were removed.
    pub fn compact_through(&self, through: u64) -> Result<usize> {
        let mut removed = 0;
        for (sequence, name) in self.entries()? {
            if sequence > through {
                break;
            }
            self.store.remove(&name)?;
            removed += 1;
        }
        Ok(removed)
    }

    fn entries(&self) -> Result<Vec<(u64, String)>> {
        let mut entries = Vec::new();
        for name in self.store.list(RECORD_PREFIX)? {
            match parse_record_name(&name) {
                Some(sequence) => entries.push((sequence, name)),
                None => tracing::warn!("Ignoring unexpected log entry {}", name),
            }
        }
        entries.sort_unstable_by_key(|(sequence, _)| *sequence);
        Ok(entries)
    }
}

/// Lazy iterator over log records. Yields an error (and keeps going only if
/// the caller keeps asking) on unreadable or corrupt entries.
pub struct RecordIter<'a, S: DurableStore> {
    store: &'a Arc<S>,
    names: std::vec::IntoIter<(u64, String)>,
}

impl<'a, S: DurableStore> Iterator for RecordIter<'a, S> {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let (sequence, name) = self.names.next()?;
        Some(read_entry(self.store.as_ref(), sequence, name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.names.size_hint()
    }
}

fn read_entry<S: DurableStore>(store: &S, sequence: u64, name: String) -> Result<LogEntry> {
    let bytes = store.read(&name)?;
    let record = decode_record(&bytes).map_err(|source| EventLogError::Corrupt {
        name: name.clone(),
        source,
    })?;
    if record.sequence != sequence {
        return Err(EventLogError::NameMismatch {
            name,
            found: record.sequence,
        });
    }
    Ok(LogEntry {
        record,
        encoded_len: bytes.len() as u64,
    })
}
