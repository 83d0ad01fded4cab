// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! State serialization formats.
//!
//! `Json` is tolerant of any serde shape and readable on disk. `Binary`
//! (bincode, standard config) is compact but cannot carry types that need
//! `deserialize_any`, such as `serde_json::Value`.

use crate::error::{KernelError, KernelResult};
use alloc::string::ToString;
use alloc::vec::Vec;
use core::str::FromStr;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Binary,
}

impl SnapshotFormat {
    /// Tag byte stored in snapshot headers.
    pub fn tag(self) -> u8 {
        match self {
            SnapshotFormat::Json => 1,
            SnapshotFormat::Binary => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(SnapshotFormat::Json),
            2 => Some(SnapshotFormat::Binary),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Binary => "binary",
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> KernelResult<Vec<u8>> {
        match self {
            SnapshotFormat::Json => {
                serde_json::to_vec(value).map_err(|e| KernelError::Encode(e.to_string()))
            }
            SnapshotFormat::Binary => {
                bincode::serde::encode_to_vec(value, bincode::config::standard())
                    .map_err(|e| KernelError::Encode(e.to_string()))
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> KernelResult<T> {
        match self {
            SnapshotFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| KernelError::Decode(e.to_string()))
            }
            SnapshotFormat::Binary => {
                let (value, read) =
                    bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())
                        .map_err(|e| KernelError::Decode(e.to_string()))?;
                if read != bytes.len() {
                    return Err(KernelError::Decode(alloc::format!(
                        "{} trailing bytes after state",
                        bytes.len() - read
                    )));
                }
                Ok(value)
            }
        }
    }
}

impl FromStr for SnapshotFormat {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "binary" | "bincode" => Ok(SnapshotFormat::Binary),
            other => Err(KernelError::UnknownFormat(other.to_string())),
        }
    }
}

impl core::fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
