//! Segment
//!
//! Pairs one store with one index under a shared base offset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::config::{SegmentConfig, SyncStrategy};
use crate::error::{LogError, Result};

use super::index::Index;
use super::store::{Store, LEN_WIDTH};

/// Extension of store files
pub const STORE_EXT: &str = "store";

/// Extension of index files
pub const INDEX_EXT: &str = "index";

/// A bounded run of consecutive offsets starting at `base_offset`
pub struct Segment {
    base_offset: u64,
    /// Offset the next appended record receives
    next_offset: AtomicU64,
    store: Store,
    index: RwLock<Index>,
    config: SegmentConfig,
    /// Set once a read finds the index and store disagreeing
    corrupt: AtomicBool,
}

impl Segment {
    /// Open or create the segment with `base_offset` inside `dir`
    ///
    /// The index tail is checked against the store; if they disagree (for
    /// example after an unclean shutdown) the index is rebuilt from the store.
    pub fn open(
        dir: &Path,
        base_offset: u64,
        config: SegmentConfig,
        sync_strategy: SyncStrategy,
    ) -> Result<Self> {
        let store = Store::open(&Self::file_path(dir, base_offset, STORE_EXT), sync_strategy)?;
        let index = Index::open(
            &Self::file_path(dir, base_offset, INDEX_EXT),
            config.max_index_bytes,
        )?;

        let segment = Self {
            base_offset,
            next_offset: AtomicU64::new(base_offset),
            store,
            index: RwLock::new(index),
            config,
            corrupt: AtomicBool::new(false),
        };
        segment.reconcile()?;

        Ok(segment)
    }

    /// Path of one of a segment's files
    pub fn file_path(dir: &Path, base_offset: u64, ext: &str) -> PathBuf {
        dir.join(format!("{}.{}", base_offset, ext))
    }

    /// Recover `next_offset`, rebuilding the index if it does not match the store
    fn reconcile(&self) -> Result<()> {
        let mut index = self.index.write();

        if self.index_matches_store(&index)? {
            let next = match index.last() {
                Ok((relative, _)) => self.base_offset + u64::from(relative) + 1,
                Err(_) => self.base_offset,
            };
            self.next_offset.store(next, Ordering::Release);
            return Ok(());
        }

        let positions = self.store.recover_frames()?;
        tracing::warn!(
            "Rebuilding index of segment {} from {} store frames (index had {} entries)",
            self.base_offset,
            positions.len(),
            index.len()
        );

        index.clear();
        index.reserve(positions.len() as u64)?;
        for (relative, &position) in positions.iter().enumerate() {
            let relative = u32::try_from(relative).map_err(|_| {
                LogError::Corruption(format!(
                    "segment {} holds more records than a relative offset can address",
                    self.base_offset
                ))
            })?;
            index.write(relative, position)?;
        }
        index.flush()?;

        self.next_offset
            .store(self.base_offset + positions.len() as u64, Ordering::Release);
        Ok(())
    }

    /// Fast consistency check: the last entry sits in its own slot and its
    /// frame ends exactly where the store ends
    fn index_matches_store(&self, index: &Index) -> Result<bool> {
        let store_size = self.store.size();
        if index.is_empty() {
            return Ok(store_size == 0);
        }

        let (relative, position) = index.last()?;
        if u64::from(relative) != index.len() - 1 {
            return Ok(false);
        }

        Ok(match self.store.frame_len(position)? {
            Some(len) => position + LEN_WIDTH + len == store_size,
            None => false,
        })
    }

    /// Append a record, returning its offset
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let mut index = self.index.write();
        let offset = self.next_offset.load(Ordering::Acquire);

        // Refuse before touching the store so the two never drift apart
        let relative = u32::try_from(offset - self.base_offset).map_err(|_| {
            LogError::IndexFull {
                capacity: index.capacity(),
            }
        })?;
        if index.is_full() {
            return Err(LogError::IndexFull {
                capacity: index.capacity(),
            });
        }

        let (position, _) = self.store.append(payload)?;
        index.write(relative, position)?;
        self.next_offset.store(offset + 1, Ordering::Release);

        Ok(offset)
    }

    /// Read the record stored at `offset`
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        if self.is_corrupt() {
            return Err(LogError::Corruption(format!(
                "segment {} is marked corrupt",
                self.base_offset
            )));
        }

        let next = self.next_offset();
        if offset < self.base_offset || offset >= next {
            return Err(LogError::OffsetOutOfRange {
                offset,
                lowest: self.base_offset,
                next,
            });
        }

        let (_, position) = {
            let index = self.index.read();
            index.read((offset - self.base_offset) as u32)?
        };

        match self.store.read(position) {
            Ok(payload) => Ok(payload),
            Err(LogError::NotFound(msg)) | Err(LogError::Corruption(msg)) => {
                self.corrupt.store(true, Ordering::Release);
                tracing::error!(
                    "Segment {} corrupt reading offset {}: {}",
                    self.base_offset,
                    offset,
                    msg
                );
                Err(LogError::Corruption(format!(
                    "offset {} in segment {}: {}",
                    offset, self.base_offset, msg
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Whether either file has reached its configured limit
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes || self.index.read().is_full()
    }

    /// Make everything appended so far durable. The segment stays readable.
    pub fn seal(&self) -> Result<()> {
        self.store.sync()?;
        self.index.read().flush()
    }

    /// Close the store and the index, attempting both even if one fails
    pub fn close(&self) -> Result<()> {
        let store = self.store.close();
        let index = self.index.write().close();
        store.and(index)
    }

    /// Close and delete both backing files
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        remove_if_exists(self.store.path())?;
        remove_if_exists(self.index.read().path())?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset.load(Ordering::Acquire)
    }

    /// Number of records held
    pub fn record_count(&self) -> u64 {
        self.next_offset() - self.base_offset
    }

    pub fn is_corrupt(&self) -> bool {
        self.corrupt.load(Ordering::Acquire)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Bytes held by the index
    pub fn index_size(&self) -> u64 {
        self.index.read().size()
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
