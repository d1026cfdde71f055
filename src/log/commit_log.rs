//! Commit Log
//!
//! Ordered collection of segments. Appends go to the active (newest)
//! segment, which is replaced by a fresh one once it reaches its limits;
//! reads binary-search the segments by base offset.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{LogError, Result};

use super::reader::LogReader;
use super::segment::{Segment, INDEX_EXT, STORE_EXT};

/// A durable, append-only, segmented record log
///
/// ## Concurrency Model
///
/// - **Appends** (and rotation, truncation, reset): serialized by
///   `append_lock`, so offset assignment and the rotate decision are atomic.
/// - **Reads**: share the `segments` read lock; they run concurrently with
///   each other and with an append into the active segment. Rotation and
///   truncation take the write lock, so a reader never sees the segment
///   list mid-change and never reads a segment being deleted.
pub struct Log {
    config: Config,

    /// Segments ordered by base offset; the last one is active
    segments: RwLock<Vec<Segment>>,

    /// Serializes appends and every change to the segment list
    append_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Log {
    /// Open or create a log in `config.data_dir`
    ///
    /// Existing segments are discovered from the files in the directory and
    /// opened in ascending base offset order; the highest becomes active.
    /// An empty directory is bootstrapped with one segment at
    /// `config.segment.initial_offset`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let segments = Self::load_segments(&config)?;
        tracing::info!(
            "Opened log at {} with {} segment(s), offsets [{}, {})",
            config.data_dir.display(),
            segments.len(),
            segments.first().map_or(0, Segment::base_offset),
            segments.last().map_or(0, Segment::next_offset),
        );

        Ok(Self {
            config,
            segments: RwLock::new(segments),
            append_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    fn load_segments(config: &Config) -> Result<Vec<Segment>> {
        let mut base_offsets = BTreeSet::new();

        for entry in fs::read_dir(&config.data_dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if ext != Some(STORE_EXT) && ext != Some(INDEX_EXT) {
                continue;
            }
            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                Some(base) => {
                    base_offsets.insert(base);
                }
                None => tracing::debug!("Ignoring unrecognized file {}", path.display()),
            }
        }

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base in base_offsets {
            segments.push(Segment::open(
                &config.data_dir,
                base,
                config.segment,
                config.sync_strategy,
            )?);
        }

        if segments.is_empty() {
            segments.push(Segment::open(
                &config.data_dir,
                config.segment.initial_offset,
                config.segment,
                config.sync_strategy,
            )?);
        }

        Ok(segments)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed);
        }
        Ok(())
    }

    fn active(segments: &[Segment]) -> Result<&Segment> {
        segments
            .last()
            .ok_or_else(|| LogError::Corruption("log has no segments".to_string()))
    }

    /// Append a record, returning its offset
    ///
    /// Rotates to a new segment when the active one is full, either after
    /// this write or (when the index had no room) before retrying it.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        let _append_guard = self.append_lock.lock();
        self.ensure_open()?;

        // A previous rotation may have failed after its write succeeded
        if Self::active(&self.segments.read())?.is_maxed() {
            self.rotate()?;
        }

        for _ in 0..2 {
            let (result, maxed) = {
                let segments = self.segments.read();
                let active = Self::active(&segments)?;
                let result = active.append(payload);
                (result, active.is_maxed())
            };

            match result {
                Ok(offset) => {
                    if maxed {
                        // The record is durable; a failed rotation is retried
                        // by the next append instead of failing this one.
                        if let Err(e) = self.rotate() {
                            tracing::warn!(
                                "Segment rotation after offset {} failed: {}",
                                offset,
                                e
                            );
                        }
                    }
                    return Ok(offset);
                }
                Err(LogError::IndexFull { capacity }) => {
                    tracing::debug!("Active index full ({} bytes), rotating", capacity);
                    self.rotate()?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(LogError::Config(
            "record does not fit into a freshly created segment".to_string(),
        ))
    }

    /// Seal the active segment and start a new one at the next offset.
    /// Called with `append_lock` held.
    fn rotate(&self) -> Result<()> {
        let mut segments = self.segments.write();
        let active = Self::active(&segments)?;
        let base = active.next_offset();
        active.seal()?;

        let segment = Segment::open(
            &self.config.data_dir,
            base,
            self.config.segment,
            self.config.sync_strategy,
        )?;
        segments.push(segment);

        tracing::debug!(
            "Rotated to segment {} ({} segments)",
            base,
            segments.len()
        );
        Ok(())
    }

    /// Read the record at `offset`
    pub fn read(&self, offset: u64) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let segments = self.segments.read();

        let lowest = segments.first().map_or(0, Segment::base_offset);
        let next = segments.last().map_or(0, Segment::next_offset);

        // Base offsets are strictly increasing
        let idx = segments.partition_point(|s| s.base_offset() <= offset);
        let segment = match idx.checked_sub(1).map(|i| &segments[i]) {
            Some(segment) if offset < segment.next_offset() => segment,
            _ => {
                return Err(LogError::OffsetOutOfRange {
                    offset,
                    lowest,
                    next,
                })
            }
        };

        segment.read(offset)
    }

    /// Remove every segment whose highest offset is below `lowest_offset_to_keep`
    ///
    /// The active segment is never removed. Returns how many segments were
    /// deleted.
    pub fn truncate(&self, lowest_offset_to_keep: u64) -> Result<usize> {
        let _append_guard = self.append_lock.lock();
        self.ensure_open()?;
        let mut segments = self.segments.write();

        let mut removed = 0;
        while segments.len() > 1 && segments[0].next_offset() <= lowest_offset_to_keep {
            segments[0].remove()?;
            let segment = segments.remove(0);
            tracing::debug!(
                "Removed segment [{}, {})",
                segment.base_offset(),
                segment.next_offset()
            );
            removed += 1;
        }

        tracing::info!(
            "Truncated log below offset {}: {} segment(s) removed, {} remaining",
            lowest_offset_to_keep,
            removed,
            segments.len()
        );
        Ok(removed)
    }

    /// Stream the raw store bytes of every segment in offset order
    pub fn reader(&self) -> Result<LogReader> {
        self.ensure_open()?;
        let segments = self.segments.read();
        LogReader::new(segments.iter().map(Segment::store))
    }

    /// Delete all data and start over with a single empty segment
    pub fn reset(&self) -> Result<()> {
        let _append_guard = self.append_lock.lock();
        let mut segments = self.segments.write();

        for segment in segments.drain(..) {
            segment.remove()?;
        }
        segments.push(Segment::open(
            &self.config.data_dir,
            self.config.segment.initial_offset,
            self.config.segment,
            self.config.sync_strategy,
        )?);
        self.closed.store(false, Ordering::Release);

        tracing::info!("Reset log at {}", self.config.data_dir.display());
        Ok(())
    }

    /// Close every segment. Safe to call more than once.
    ///
    /// A segment that fails to close does not stop the others; the first
    /// error is returned and the log stays open so `close` can be retried.
    pub fn close(&self) -> Result<()> {
        let _append_guard = self.append_lock.lock();
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let segments = self.segments.read();
        let mut first_error = None;
        for segment in segments.iter() {
            if let Err(e) = segment.close() {
                tracing::error!("Failed to close segment {}: {}", segment.base_offset(), e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.closed.store(true, Ordering::Release);
        tracing::info!("Closed log at {}", self.config.data_dir.display());
        Ok(())
    }

    /// Close the log and delete its directory
    pub fn remove(self) -> Result<()> {
        self.close()?;
        fs::remove_dir_all(&self.config.data_dir)?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Lowest offset still retained
    pub fn lowest_offset(&self) -> u64 {
        self.segments.read().first().map_or(0, Segment::base_offset)
    }

    /// Offset the next appended record will receive
    pub fn next_offset(&self) -> u64 {
        self.segments.read().last().map_or(0, Segment::next_offset)
    }

    /// Highest readable offset, `None` when no record is retained
    pub fn highest_offset(&self) -> Option<u64> {
        let segments = self.segments.read();
        let lowest = segments.first().map_or(0, Segment::base_offset);
        let next = segments.last().map_or(0, Segment::next_offset);
        (next > lowest).then(|| next - 1)
    }

    /// Number of segments currently on disk
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    /// Base offsets of all segments, oldest first
    pub fn segment_base_offsets(&self) -> Vec<u64> {
        self.segments.read().iter().map(Segment::base_offset).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
