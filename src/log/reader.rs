//! Log Reader
//!
//! Sequential frame-by-frame reads of the entity log file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{LedgerError, Result};

use super::{LogEntry, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// Reads frames from the log file, front to back
pub struct LogReader {
    reader: BufReader<File>,

    /// Offset of the next unread frame
    position: u64,

    /// File length when the reader was opened
    file_len: u64,

    /// Set once an error has been returned; the iterator then stops
    failed: bool,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
            failed: false,
        })
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at a clean end of file and `LogCorruption` for a
    /// torn or damaged frame.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        let remaining = self.file_len - self.position;
        if remaining == 0 {
            return Ok(None);
        }

        if remaining < HEADER_SIZE as u64 {
            return Err(LedgerError::LogCorruption(format!(
                "torn header at offset {}: {} trailing bytes",
                self.position, remaining
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;
        let (sequence, crc, len) = LogEntry::decode_header(&header);

        if len > MAX_PAYLOAD_SIZE || LogEntry::frame_len(len) > remaining {
            return Err(LedgerError::LogCorruption(format!(
                "torn frame at offset {}: sequence {} claims {} bytes, {} remain",
                self.position,
                sequence,
                len,
                remaining - HEADER_SIZE as u64
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload)?;

        let entry = LogEntry::from_parts(sequence, crc, &payload)?;
        self.position += LogEntry::frame_len(len);
        Ok(Some(entry))
    }

    /// Offset just past the last frame successfully read
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }
}

impl Iterator for LogReader {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
