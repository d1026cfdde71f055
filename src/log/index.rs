//! Index
//!
//! Fixed-width table mapping a record's offset (relative to the segment's
//! base offset) to the position of its frame in the store. The file is
//! pre-allocated to its maximum size and memory-mapped; on close it is cut
//! back to the bytes actually used so a reopen recovers the true entry count.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{LogError, Result};

/// Bytes used by the relative offset of an entry
pub const OFFSET_WIDTH: u64 = 4;

/// Bytes used by the store position of an entry
pub const POSITION_WIDTH: u64 = 8;

/// Total bytes per index entry
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// Memory-mapped offset → position table
pub struct Index {
    path: PathBuf,
    file: File,
    /// `None` once the index is closed
    mmap: Option<MmapMut>,
    /// Bytes of the mapping holding entries
    size: u64,
}

impl Index {
    /// Open or create an index file, growing it to `max_bytes` for mapping
    pub fn open(path: &Path, max_bytes: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut size = file.metadata()?.len();
        let torn = size % ENTRY_WIDTH;
        if torn != 0 {
            tracing::warn!(
                "Dropping {} bytes of torn entry at the end of {}",
                torn,
                path.display()
            );
            size -= torn;
        }

        file.set_len(max_bytes.max(size))?;

        // SAFETY: the index file is owned exclusively by this segment and is
        // never resized while the mapping is alive.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap: Some(mmap),
            size,
        })
    }

    /// Append an entry
    ///
    /// Fails with `IndexFull` once the pre-allocated region cannot hold
    /// another entry.
    pub fn write(&mut self, relative_offset: u32, position: u64) -> Result<()> {
        let size = self.size;
        let mmap = self.mmap.as_mut().ok_or(LogError::Closed)?;
        let capacity = mmap.len() as u64;

        if size + ENTRY_WIDTH > capacity {
            return Err(LogError::IndexFull { capacity });
        }

        let start = size as usize;
        let split = start + OFFSET_WIDTH as usize;
        let end = start + ENTRY_WIDTH as usize;
        mmap[start..split].copy_from_slice(&relative_offset.to_be_bytes());
        mmap[split..end].copy_from_slice(&position.to_be_bytes());

        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Look up the entry for `relative_offset`
    ///
    /// Entries are dense, so this is a bounds check followed by a direct read.
    pub fn read(&self, relative_offset: u32) -> Result<(u32, u64)> {
        if u64::from(relative_offset) >= self.len() {
            return Err(LogError::NotFound(format!(
                "no index entry for relative offset {} in {} ({} entries)",
                relative_offset,
                self.path.display(),
                self.len()
            )));
        }
        self.entry(u64::from(relative_offset))
    }

    /// The highest-numbered entry
    pub fn last(&self) -> Result<(u32, u64)> {
        if self.is_empty() {
            return Err(LogError::NotFound(format!(
                "index {} is empty",
                self.path.display()
            )));
        }
        self.entry(self.len() - 1)
    }

    fn entry(&self, slot: u64) -> Result<(u32, u64)> {
        let mmap = self.mmap.as_ref().ok_or(LogError::Closed)?;

        let start = (slot * ENTRY_WIDTH) as usize;
        let split = start + OFFSET_WIDTH as usize;
        let end = start + ENTRY_WIDTH as usize;

        let mut offset_buf = [0u8; OFFSET_WIDTH as usize];
        offset_buf.copy_from_slice(&mmap[start..split]);
        let mut position_buf = [0u8; POSITION_WIDTH as usize];
        position_buf.copy_from_slice(&mmap[split..end]);

        Ok((
            u32::from_be_bytes(offset_buf),
            u64::from_be_bytes(position_buf),
        ))
    }

    /// Forget every entry (the mapping keeps its capacity)
    pub(crate) fn clear(&mut self) {
        self.size = 0;
    }

    /// Make sure the mapping can hold at least `entries` entries
    pub(crate) fn reserve(&mut self, entries: u64) -> Result<()> {
        let needed = entries * ENTRY_WIDTH;
        if needed <= self.capacity() {
            return Ok(());
        }
        if let Some(mmap) = self.mmap.take() {
            mmap.flush()?;
        }
        self.file.set_len(needed)?;

        // SAFETY: see `open`; the previous mapping was dropped above.
        self.mmap = Some(unsafe { MmapMut::map_mut(&self.file)? });
        Ok(())
    }

    /// Flush dirty pages of the mapping to disk
    pub fn flush(&self) -> Result<()> {
        if let Some(mmap) = self.mmap.as_ref() {
            mmap.flush()?;
        }
        Ok(())
    }

    /// Flush, release the mapping and cut the file to its used size.
    /// Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        let Some(mmap) = self.mmap.take() else {
            return Ok(());
        };
        mmap.flush()?;
        drop(mmap);

        self.file.set_len(self.size)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Whether another entry would overflow the mapping
    pub fn is_full(&self) -> bool {
        self.size + ENTRY_WIDTH > self.capacity()
    }

    /// Bytes available to the mapping
    pub fn capacity(&self) -> u64 {
        self.mmap.as_ref().map_or(0, |m| m.len() as u64)
    }

    /// Bytes holding entries
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close index {}: {}", self.path.display(), e);
        }
    }
}
