//! Log Writer
//!
//! Handles appending frames to the entity log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::LogSyncStrategy;
use crate::error::{LedgerError, Result};

use super::LogEntry;

/// Byte sink behind a [`LogWriter`]
///
/// Implemented for [`File`]. Anything else (a sink that fails on demand, for
/// example) can be handed to [`LogWriter::with_sink`].
pub trait LogSink: Write + Send {
    /// Flush file contents to durable storage
    fn sync_data(&mut self) -> io::Result<()>;

    /// Cut the sink back to `len` bytes
    fn set_len(&mut self, len: u64) -> io::Result<()>;
}

impl LogSink for File {
    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }
}

/// Appends frames to the log file
pub struct LogWriter {
    /// Log file path
    path: PathBuf,

    /// Where frames go; a `File` opened in append mode outside of tests
    sink: Box<dyn LogSink>,

    /// Length of the file up to the last complete frame
    len: u64,

    /// How often to fsync
    sync_strategy: LogSyncStrategy,

    /// Frames written since the last fsync
    unsynced: usize,

    /// Set when a failed append could not be rolled back. The file may end in
    /// a frame nobody was told about, so every later append is refused.
    poisoned: bool,
}

impl LogWriter {
    /// Open or create a log file; new frames go after any existing content.
    ///
    /// The caller is expected to have run recovery first so the file ends on
    /// a frame boundary.
    pub fn open(path: &Path, sync_strategy: LogSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let len = file.metadata()?.len();

        Ok(Self::with_sink(path, Box::new(file), len, sync_strategy))
    }

    /// Wrap an already-open sink that currently holds `len` bytes of whole frames
    pub fn with_sink(
        path: &Path,
        sink: Box<dyn LogSink>,
        len: u64,
        sync_strategy: LogSyncStrategy,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            sink,
            len,
            sync_strategy,
            unsynced: 0,
            poisoned: false,
        }
    }

    /// Append one entry.
    ///
    /// If the write or the fsync that follows it fails, the file is cut back
    /// to the previous frame boundary before the error is returned, so a
    /// rejected frame never survives to be replayed. If that cut fails too,
    /// the writer is poisoned.
    pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if self.poisoned {
            return Err(LedgerError::StorageUnavailable(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "{} may hold an unacknowledged frame; reopen to recover",
                    self.path.display()
                ),
            )));
        }

        let bytes = entry.serialize()?;
        let should_sync = match self.sync_strategy {
            LogSyncStrategy::EveryWrite => true,
            LogSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };

        if let Err(e) = self.write_frame(&bytes, should_sync) {
            self.roll_back();
            return Err(e.into());
        }

        self.len += bytes.len() as u64;
        self.unsynced = if should_sync { 0 } else { self.unsynced + 1 };
        Ok(())
    }

    fn write_frame(&mut self, bytes: &[u8], sync: bool) -> io::Result<()> {
        self.sink.write_all(bytes)?;
        if sync {
            self.sink.flush()?;
            self.sink.sync_data()?;
        }
        Ok(())
    }

    fn roll_back(&mut self) {
        if let Err(e) = self.sink.set_len(self.len) {
            tracing::error!(
                "Failed to roll back rejected frame in {}: {}; refusing further appends",
                self.path.display(),
                e
            );
            self.poisoned = true;
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.sink.flush()?;
        self.sink.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Bytes written through complete frames
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frames written since the last fsync
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }

    /// True once a failed append could not be undone
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
