use crate::error::{PersistenceError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use statehost_kernel::TransitionRecord;
use std::io::Read;

/// Header of one record entry. The payload is the bincode encoding of a
/// `TransitionRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFrameHeader {
    pub version: u16,
    pub sequence: u64,
    pub payload_len: u32,
    pub checksum: u64,
}

impl RecordFrameHeader {
    pub const SIZE: usize = 4 + 2 + 2 + 8 + 4 + 8; // 28 bytes
    pub const MAGIC: [u8; 4] = *b"SHRC";
    pub const VERSION: u16 = 1;

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != Self::MAGIC {
            return Err(PersistenceError::InvalidMagic);
        }

        let version = reader.read_u16::<LittleEndian>()?;
        if version != Self::VERSION {
            return Err(PersistenceError::UnsupportedVersion(version as u32));
        }
        let _reserved = reader.read_u16::<LittleEndian>()?;
        let sequence = reader.read_u64::<LittleEndian>()?;
        let payload_len = reader.read_u32::<LittleEndian>()?;
        let checksum = reader.read_u64::<LittleEndian>()?;

        Ok(Self {
            version,
            sequence,
            payload_len,
            checksum,
        })
    }

    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        buf.extend_from_slice(&Self::MAGIC);
        buf.write_u16::<LittleEndian>(self.version)?;
        buf.write_u16::<LittleEndian>(0)?;
        buf.write_u64::<LittleEndian>(self.sequence)?;
        buf.write_u32::<LittleEndian>(self.payload_len)?;
        buf.write_u64::<LittleEndian>(self.checksum)?;
        Ok(())
    }
}

pub fn record_checksum(sequence: u64, payload: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(&sequence.to_le_bytes());
    digest.write(&(payload.len() as u32).to_le_bytes());
    digest.write(payload);
    digest.sum64()
}

pub fn encode_record(record: &TransitionRecord) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(record, bincode::config::standard())
        .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    let payload_len = u32::try_from(payload.len())
        .map_err(|_| PersistenceError::InvalidFormat(format!("record payload too large: {} bytes", payload.len())))?;

    let header = RecordFrameHeader {
        version: RecordFrameHeader::VERSION,
        sequence: record.sequence,
        payload_len,
        checksum: record_checksum(record.sequence, &payload),
    };

    let mut buf = Vec::with_capacity(RecordFrameHeader::SIZE + payload.len());
    header.write_to(&mut buf)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Validates the frame (magic, length, checksum) and decodes the record.
pub fn decode_record(bytes: &[u8]) -> Result<TransitionRecord> {
    let mut reader = bytes;
    let header = RecordFrameHeader::read_from(&mut reader)?;
    let payload = reader;

    if payload.len() as u64 != header.payload_len as u64 {
        return Err(PersistenceError::Truncated {
            expected: header.payload_len as u64,
            found: payload.len() as u64,
        });
    }

    let found = record_checksum(header.sequence, payload);
    if found != header.checksum {
        return Err(PersistenceError::ChecksumMismatch {
            expected: header.checksum,
            found,
        });
    }

    let (record, read) = bincode::serde::decode_from_slice::<TransitionRecord, _>(
        payload,
        bincode::config::standard(),
    )
    .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    if read != payload.len() {
        return Err(PersistenceError::InvalidFormat(format!(
            "{} trailing bytes after record",
            payload.len() - read
        )));
    }
    if record.sequence != header.sequence {
        return Err(PersistenceError::SequenceMismatch {
            frame: header.sequence,
            payload: record.sequence,
        });
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statehost_kernel::{RequestDescriptor, ResponseDescriptor};

    fn sample() -> TransitionRecord {
        TransitionRecord::new(
            3,
            1_234,
            RequestDescriptor::new("PUT", "/kv/a").with_body("hello"),
            ResponseDescriptor::ok("stored"),
        )
    }

    #[test]
    fn test_record_frame_decodes() {
        let bytes = encode_record(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"SHRC");
        assert_eq!(decode_record(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_flipped_payload_bit_is_detected() {
        let mut bytes = encode_record(&sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            decode_record(&bytes),
            Err(PersistenceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_frame_is_detected() {
        let bytes = encode_record(&sample()).unwrap();
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode_record(cut),
            Err(PersistenceError::Truncated { .. })
        ));

        let header_only = &bytes[..10];
        assert!(matches!(decode_record(header_only), Err(PersistenceError::IoError(_))));
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = encode_record(&sample()).unwrap();
        bytes[0..4].copy_from_slice(b"BADM");
        assert!(matches!(decode_record(&bytes), Err(PersistenceError::InvalidMagic)));
    }
}
