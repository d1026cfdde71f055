//! Store
//!
//! Append-only record file. Every record is framed as
//! `[len: u64 BE][payload]` and appended at the current end of the file.
//!
//! A frame is handed to the OS before its append returns, so the file
//! length always equals the sum of acknowledged frames. A failed append
//! cuts the file back to that length; fsync follows the [`SyncStrategy`].

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;

use crate::config::SyncStrategy;
use crate::error::{LogError, Result};

/// Width of the length prefix in front of every record
pub const LEN_WIDTH: u64 = 8;

/// File a store writes its frames to
///
/// Writes must land at the end of the file, as with a [`File`] opened in
/// append mode; reads go wherever the last seek put them.
pub trait StoreFile: Read + Write + Seek + Send {
    /// Current length in bytes
    fn file_len(&self) -> io::Result<u64>;

    /// Cut (or extend) the file to `size` bytes
    fn set_len(&self, size: u64) -> io::Result<()>;

    /// Push written data to stable storage
    fn sync_data(&self) -> io::Result<()>;
}

impl StoreFile for File {
    fn file_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_len(&self, size: u64) -> io::Result<()> {
        File::set_len(self, size)
    }

    fn sync_data(&self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Append-only file of length-prefixed records
pub struct Store<F: StoreFile = File> {
    path: PathBuf,
    inner: Mutex<StoreInner<F>>,
}

struct StoreInner<F> {
    /// `None` once the store is closed
    file: Option<F>,
    /// Sum of all acknowledged frames
    size: u64,
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
    /// A failed append may have left bytes past `size`
    torn: bool,
}

impl Store<File> {
    /// Open or create a store file
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        Self::with_file(path, file, sync_strategy)
    }
}

impl<F: StoreFile> Store<F> {
    /// Build a store on an already opened file. `path` names it in logs.
    pub fn with_file(path: &Path, file: F, sync_strategy: SyncStrategy) -> Result<Self> {
        let size = file.file_len()?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(StoreInner {
                file: Some(file),
                size,
                sync_strategy,
                unsynced: 0,
                torn: false,
            }),
        })
    }

    /// Append a record
    ///
    /// Returns `(position, bytes_written)` where `position` is where the
    /// frame begins and `bytes_written` includes the length prefix. On error
    /// nothing of the frame remains in the file and the store size is
    /// unchanged.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        inner.repair_tail()?;

        let mut frame = BytesMut::with_capacity(LEN_WIDTH as usize + payload.len());
        frame.put_u64(payload.len() as u64);
        frame.put_slice(payload);

        let position = inner.size;
        if let Err(e) = inner.write_frame(&frame) {
            inner.rollback(position);
            return Err(e);
        }

        Ok((position, frame.len() as u64))
    }

    /// Read the record whose frame starts at `position`
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let file = inner.file()?;

        if position >= size {
            return Err(LogError::NotFound(format!(
                "position {} beyond store size {}",
                position, size
            )));
        }
        if position + LEN_WIDTH > size {
            return Err(LogError::Corruption(format!(
                "truncated length prefix at position {} (store size {})",
                position, size
            )));
        }

        file.seek(SeekFrom::Start(position))?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_buf)?;
        let len = u64::from_be_bytes(len_buf);

        let available = size - position - LEN_WIDTH;
        if len > available {
            return Err(LogError::Corruption(format!(
                "frame at position {} declares {} bytes but only {} remain",
                position, len, available
            )));
        }

        let mut payload = vec![0u8; len as usize];
        file.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Length of the frame payload starting at `position`, if a whole frame is there
    pub(crate) fn frame_len(&self, position: u64) -> Result<Option<u64>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let file = inner.file()?;

        if position + LEN_WIDTH > size {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(position))?;
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact(&mut len_buf)?;
        let len = u64::from_be_bytes(len_buf);

        if len > size - position - LEN_WIDTH {
            return Ok(None);
        }
        Ok(Some(len))
    }

    /// Walk every complete frame, dropping an incomplete trailing frame
    ///
    /// Returns the start position of each complete frame in file order.
    pub(crate) fn recover_frames(&self) -> Result<Vec<u64>> {
        let mut inner = self.inner.lock();
        let size = inner.size;

        let mut positions = Vec::new();
        let mut position = 0u64;
        {
            let file = inner.file()?;
            file.seek(SeekFrom::Start(0))?;
            let mut reader = BufReader::new(file);

            while position + LEN_WIDTH <= size {
                let mut len_buf = [0u8; LEN_WIDTH as usize];
                reader.read_exact(&mut len_buf)?;
                let len = u64::from_be_bytes(len_buf);

                if len > size - position - LEN_WIDTH {
                    break;
                }
                reader.seek(SeekFrom::Start(position + LEN_WIDTH + len))?;
                positions.push(position);
                position += LEN_WIDTH + len;
            }
        }

        if position < size {
            tracing::warn!(
                "Truncating {} trailing bytes of incomplete frame in {}",
                size - position,
                self.path.display()
            );
            inner.file()?.set_len(position)?;
            inner.size = position;
        }

        Ok(positions)
    }

    /// Flush frames to the OS
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file()?.flush()?;
        Ok(())
    }

    /// Flush frames and fsync the file
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.sync()
    }

    /// Sync and release the file handle. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.file.is_none() {
            return Ok(());
        }
        inner.repair_tail()?;
        inner.sync()?;
        inner.file = None;
        Ok(())
    }

    /// Size of the store in bytes
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<F: StoreFile> StoreInner<F> {
    fn file(&mut self) -> Result<&mut F> {
        self.file.as_mut().ok_or(LogError::Closed)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let file = self.file()?;
        file.write_all(frame)?;
        file.flush()?;

        self.size += frame.len() as u64;
        self.unsynced += 1;
        self.maybe_sync()
    }

    fn sync(&mut self) -> Result<()> {
        let file = self.file()?;
        file.flush()?;
        file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Forget a failed frame and cut the file back to `size`
    fn rollback(&mut self, size: u64) {
        self.size = size;
        if self.file.is_none() {
            return;
        }
        self.torn = true;
        if let Err(e) = self.repair_tail() {
            tracing::error!("Failed to roll back partial frame: {}", e);
        }
    }

    /// Drop bytes a failed append left past `size`
    fn repair_tail(&mut self) -> Result<()> {
        if self.torn {
            let size = self.size;
            self.file()?.set_len(size)?;
            self.torn = false;
        }
        Ok(())
    }
}
