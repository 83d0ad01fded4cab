use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use statehost_kernel::{Snapshot, SnapshotFormat};
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub format: u8,
    pub body_len: u64,
    pub checksum: u64,
}

impl SnapshotHeader {
    pub const SIZE: usize = 4 + 4 + 8 + 8 + 1 + 7 + 8 + 8; // 48 bytes
    pub const MAGIC: [u8; 4] = *b"SHSN";
    pub const VERSION: u32 = 1;

    pub fn new(sequence: u64, timestamp_ms: u64, format: SnapshotFormat, body: &[u8]) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            sequence,
            timestamp_ms,
            format: format.tag(),
            body_len: body.len() as u64,
            checksum: body_checksum(body),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.magic);
        buf.write_u32::<LittleEndian>(self.version)?;
        buf.write_u64::<LittleEndian>(self.sequence)?;
        buf.write_u64::<LittleEndian>(self.timestamp_ms)?;
        buf.write_u8(self.format)?;
        buf.extend_from_slice(&[0u8; 7]);
        buf.write_u64::<LittleEndian>(self.body_len)?;
        buf.write_u64::<LittleEndian>(self.checksum)?;
        Ok(buf)
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != Self::MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(PersistenceError::UnsupportedVersion(version));
        }
        let sequence = reader.read_u64::<LittleEndian>()?;
        let timestamp_ms = reader.read_u64::<LittleEndian>()?;
        let format = reader.read_u8()?;
        let mut reserved = [0u8; 7];
        reader.read_exact(&mut reserved)?;
        let body_len = reader.read_u64::<LittleEndian>()?;
        let checksum = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            magic,
            version,
            sequence,
            timestamp_ms,
            format,
            body_len,
            checksum,
        })
    }

    pub fn snapshot_format(&self) -> Result<SnapshotFormat> {
        SnapshotFormat::from_tag(self.format)
            .ok_or_else(|| PersistenceError::InvalidFormat(format!("unknown snapshot format tag {}", self.format)))
    }
}

pub fn body_checksum(body: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(body);
    digest.sum64()
}

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let header = SnapshotHeader::new(
        snapshot.sequence,
        snapshot.timestamp_ms,
        snapshot.format,
        &snapshot.state,
    );
    let mut buf = header.to_bytes()?;
    buf.extend_from_slice(&snapshot.state);
    Ok(buf)
}

/// Validates header and checksum. The state bytes are returned undecoded.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    let mut reader = bytes;
    let header = SnapshotHeader::read_from(&mut reader)?;
    let body = reader;

    if body.len() as u64 != header.body_len {
        return Err(PersistenceError::Truncated {
            expected: header.body_len,
            found: body.len() as u64,
        });
    }

    let found = body_checksum(body);
    if found != header.checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.checksum,
            found,
        });
    }

    Ok(Snapshot {
        sequence: header.sequence,
        timestamp_ms: header.timestamp_ms,
        format: header.snapshot_format()?,
        state: body.to_vec(),
    })
}
