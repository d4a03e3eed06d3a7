//! Log Recovery
//!
//! Replays the entity log after a restart or crash.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{LedgerError, Result};
use crate::record::EntityRecord;

use super::LogReader;

/// Handles log recovery after crash
pub struct LogRecovery;

/// Result of a recovery or verification pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully read
    pub records_recovered: u64,

    /// Last valid sequence (0 if none)
    pub last_sequence: u64,

    /// File length up to the end of the last valid frame
    pub valid_len: u64,

    /// Bytes after the last valid frame
    pub bytes_discarded: u64,

    /// Whether the file was cut back to `valid_len`
    pub was_truncated: bool,

    /// Why the scan stopped early, if it did
    pub stop_reason: Option<String>,
}

/// Outcome of scanning a log file, shared by recover and verify
struct Scan {
    records: Vec<EntityRecord>,
    result: RecoveryResult,
}

impl LogRecovery {
    /// Recover records from a log file
    ///
    /// This will:
    /// 1. Read frames in order until end of file or the first bad frame
    /// 2. Treat a CRC mismatch, torn tail, undecodable record or sequence gap
    ///    as the end of the log
    /// 3. Truncate everything after the last valid frame
    /// 4. Return the valid records in sequence order
    pub fn recover(path: &Path) -> Result<(Vec<EntityRecord>, RecoveryResult)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::empty()));
        }

        let Scan { records, mut result } = Self::scan(path, true)?;

        if result.bytes_discarded > 0 {
            tracing::warn!(
                "Entity log {} has {} bad trailing bytes after sequence {} ({}); truncating",
                path.display(),
                result.bytes_discarded,
                result.last_sequence,
                result.stop_reason.as_deref().unwrap_or("unknown")
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
        }

        Ok((records, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        if !path.exists() {
            return Ok(RecoveryResult::empty());
        }
        Ok(Self::scan(path, false)?.result)
    }

    fn scan(path: &Path, keep_records: bool) -> Result<Scan> {
        let mut reader = LogReader::open(path)?;
        let mut records = Vec::new();
        let mut recovered = 0u64;
        let mut last_sequence = 0u64;
        let mut valid_len = 0u64;
        let mut stop_reason = None;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.sequence != last_sequence + 1 {
                        stop_reason = Some(format!(
                            "sequence gap: expected {}, found {}",
                            last_sequence + 1,
                            entry.sequence
                        ));
                        break;
                    }
                    let sequence = entry.sequence;
                    let record = match entry.into_record() {
                        Ok(record) => record,
                        Err(e) => {
                            stop_reason = Some(format!(
                                "undecodable record at sequence {}: {}",
                                sequence, e
                            ));
                            break;
                        }
                    };
                    last_sequence = sequence;
                    valid_len = reader.position();
                    recovered += 1;
                    if keep_records {
                        records.push(record);
                    }
                }
                Ok(None) => break,
                Err(LedgerError::LogCorruption(reason)) => {
                    stop_reason = Some(reason);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Scan {
            records,
            result: RecoveryResult {
                records_recovered: recovered,
                last_sequence,
                valid_len,
                bytes_discarded: reader.file_len() - valid_len,
                was_truncated: false,
                stop_reason,
            },
        })
    }
}

impl RecoveryResult {
    fn empty() -> Self {
        Self {
            records_recovered: 0,
            last_sequence: 0,
            valid_len: 0,
            bytes_discarded: 0,
            was_truncated: false,
            stop_reason: None,
        }
    }
}
