//! Log Entry definitions
//!
//! Defines the on-disk frame for one entity record.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::record::{ContentHash, EntityRecord, Metadata};

/// Header size: Sequence (8) + CRC (4) + Len (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// Frames larger than this are treated as a torn or corrupt header (64 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// A single framed record in the log file
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Global sequence number of the record
    pub sequence: u64,

    /// The record body
    pub record: StoredRecord,
}

/// Bincode-friendly record body.
///
/// `data` and `metadata` are arbitrary JSON, which bincode cannot describe,
/// so they travel as JSON bytes inside the binary frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub entity_type: String,
    pub version: u64,
    pub hash: String,
    pub timestamp: i64,
    pub recorded_at: i64,
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl LogEntry {
    /// Build a frame from an in-memory record
    pub fn new(record: &EntityRecord) -> Result<Self> {
        Ok(Self {
            sequence: record.sequence,
            record: StoredRecord {
                id: record.id.clone(),
                entity_type: record.entity_type.clone(),
                version: record.version,
                hash: record.hash.as_str().to_string(),
                timestamp: record.timestamp,
                recorded_at: record.recorded_at,
                data: serde_json::to_vec(&record.data)?,
                metadata: serde_json::to_vec(&record.metadata)?,
            },
        })
    }

    /// Serialize to `[seq][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&self.record)?;
        if payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(LedgerError::Serialization(format!(
                "record too large: {} bytes (max {})",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let len = payload.len() as u32;
        let crc = compute_crc(self.sequence, len, &payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.sequence.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserialize one complete frame, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LedgerError::LogCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&bytes[..HEADER_SIZE]);
        let (sequence, crc, len) = Self::decode_header(&header);

        let end = HEADER_SIZE + len as usize;
        if len > MAX_PAYLOAD_SIZE || bytes.len() < end {
            return Err(LedgerError::LogCorruption(format!(
                "incomplete payload at sequence {}: expected {} bytes, got {}",
                sequence,
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        Self::from_parts(sequence, crc, &bytes[HEADER_SIZE..end])
    }

    /// Split a header into (sequence, crc, payload length)
    pub fn decode_header(header: &[u8; HEADER_SIZE]) -> (u64, u32, u32) {
        let mut seq = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        seq.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        (
            u64::from_le_bytes(seq),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len),
        )
    }

    /// Rebuild an entry from a decoded header and its payload
    pub fn from_parts(sequence: u64, crc: u32, payload: &[u8]) -> Result<Self> {
        let actual = compute_crc(sequence, payload.len() as u32, payload);
        if actual != crc {
            return Err(LedgerError::LogCorruption(format!(
                "CRC mismatch at sequence {}: expected {:08x}, got {:08x}",
                sequence, crc, actual
            )));
        }

        let record = bincode::deserialize(payload).map_err(|e| {
            LedgerError::LogCorruption(format!("undecodable record at sequence {}: {}", sequence, e))
        })?;

        Ok(Self { sequence, record })
    }

    /// Total bytes this entry occupies on disk
    pub fn frame_len(payload_len: u32) -> u64 {
        HEADER_SIZE as u64 + payload_len as u64
    }

    /// Convert back into an in-memory record
    pub fn into_record(self) -> Result<EntityRecord> {
        let stored = self.record;
        let data = serde_json::from_slice(&stored.data)?;
        let metadata: Metadata = serde_json::from_slice(&stored.metadata)?;

        Ok(EntityRecord {
            sequence: self.sequence,
            id: stored.id,
            entity_type: stored.entity_type,
            version: stored.version,
            data,
            metadata,
            hash: ContentHash::new(stored.hash),
            timestamp: stored.timestamp,
            recorded_at: stored.recorded_at,
        })
    }
}

/// CRC over the sequence, length and payload
fn compute_crc(sequence: u64, len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&len.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}
