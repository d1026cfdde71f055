//! Tests for Segment
//!
//! These tests verify:
//! - Offset assignment from the base offset
//! - Range checks on reads
//! - "Full" detection from either size limit
//! - Recovery of next_offset on reopen
//! - Index reconciliation after unclean shutdown
//! - Corruption fencing
//! - File removal

use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use proglog::config::{SegmentConfig, SyncStrategy};
use proglog::log::{Segment, ENTRY_WIDTH, INDEX_EXT, LEN_WIDTH, STORE_EXT};
use proglog::LogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const BASE: u64 = 16;

fn segment_config(max_store_bytes: u64, max_index_bytes: u64) -> SegmentConfig {
    SegmentConfig {
        max_store_bytes,
        max_index_bytes,
        initial_offset: 0,
    }
}

fn open_segment(dir: &Path, config: SegmentConfig) -> Segment {
    Segment::open(dir, BASE, config, SyncStrategy::EveryWrite).unwrap()
}

fn fill(segment: &Segment, count: u64) {
    for i in 0..count {
        segment.append(format!("rec{:02}", i).as_bytes()).unwrap();
    }
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_append_assigns_offsets_from_base() {
    let temp = TempDir::new().unwrap();
    let segment = open_segment(temp.path(), segment_config(1024, 1024));

    assert_eq!(segment.base_offset(), BASE);
    assert_eq!(segment.next_offset(), BASE);

    assert_eq!(segment.append(b"hello").unwrap(), BASE);
    assert_eq!(segment.append(b"world").unwrap(), BASE + 1);
    assert_eq!(segment.next_offset(), BASE + 2);
    assert_eq!(segment.record_count(), 2);

    assert_eq!(segment.read(BASE).unwrap(), b"hello");
    assert_eq!(segment.read(BASE + 1).unwrap(), b"world");
}

#[test]
fn test_creates_files_named_by_base_offset() {
    let temp = TempDir::new().unwrap();
    let _segment = open_segment(temp.path(), segment_config(1024, 1024));

    assert!(temp.path().join(format!("{}.{}", BASE, STORE_EXT)).exists());
    assert!(temp.path().join(format!("{}.{}", BASE, INDEX_EXT)).exists());
}

#[test]
fn test_read_outside_segment_is_out_of_range() {
    let temp = TempDir::new().unwrap();
    let segment = open_segment(temp.path(), segment_config(1024, 1024));
    fill(&segment, 2);

    for offset in [0, BASE - 1, BASE + 2, BASE + 100] {
        let err = segment.read(offset).unwrap_err();
        assert!(
            matches!(err, LogError::OffsetOutOfRange { .. }),
            "offset {}: got {:?}",
            offset,
            err
        );
    }
}

// =============================================================================
// Size Limit Tests
// =============================================================================

#[test]
fn test_maxed_by_index() {
    let temp = TempDir::new().unwrap();
    let segment = open_segment(temp.path(), segment_config(1024, 3 * ENTRY_WIDTH));

    fill(&segment, 2);
    assert!(!segment.is_maxed());
    fill(&segment, 1);
    assert!(segment.is_maxed());

    // Nothing reaches the store once the index is out of room
    let store_size = segment.store().size();
    let err = segment.append(b"overflow").unwrap_err();
    assert!(matches!(err, LogError::IndexFull { .. }), "got {:?}", err);
    assert_eq!(segment.store().size(), store_size);
    assert_eq!(segment.next_offset(), BASE + 3);
}

#[test]
fn test_maxed_by_store() {
    let temp = TempDir::new().unwrap();
    // Every record is "recNN": 5 bytes + length prefix
    let frame = LEN_WIDTH + 5;
    let segment = open_segment(temp.path(), segment_config(3 * frame, 1024));

    fill(&segment, 2);
    assert!(!segment.is_maxed());
    fill(&segment, 1);
    assert!(segment.is_maxed());
}

// =============================================================================
// Reopen / Recovery Tests
// =============================================================================

#[test]
fn test_reopen_recovers_next_offset() {
    let temp = TempDir::new().unwrap();
    let config = segment_config(1024, 1024);
    {
        let segment = open_segment(temp.path(), config);
        fill(&segment, 3);
        segment.close().unwrap();
    }

    let segment = open_segment(temp.path(), config);
    assert_eq!(segment.next_offset(), BASE + 3);
    assert_eq!(segment.read(BASE + 2).unwrap(), b"rec02");
    assert_eq!(segment.append(b"more").unwrap(), BASE + 3);
}

#[test]
fn test_reopen_with_preallocated_index() {
    let temp = TempDir::new().unwrap();
    let config = segment_config(1024, 1024);
    {
        let segment = open_segment(temp.path(), config);
        fill(&segment, 3);
        segment.close().unwrap();
    }

    // Unclean shutdown leaves the index at its pre-allocated size
    let index_path = Segment::file_path(temp.path(), BASE, INDEX_EXT);
    OpenOptions::new()
        .write(true)
        .open(&index_path)
        .unwrap()
        .set_len(1024)
        .unwrap();

    let segment = open_segment(temp.path(), config);
    assert_eq!(segment.next_offset(), BASE + 3);
    assert_eq!(segment.index_size(), 3 * ENTRY_WIDTH);
    for i in 0..3 {
        assert_eq!(segment.read(BASE + i).unwrap(), format!("rec{:02}", i).as_bytes());
    }
    assert_eq!(segment.append(b"next").unwrap(), BASE + 3);
}

#[test]
fn test_reopen_truncates_torn_store_frame() {
    let temp = TempDir::new().unwrap();
    let config = segment_config(1024, 1024);
    let clean_size = {
        let segment = open_segment(temp.path(), config);
        fill(&segment, 3);
        segment.close().unwrap();
        segment.store().size()
    };

    // A frame that claims 100 bytes but only has 2
    let store_path = Segment::file_path(temp.path(), BASE, STORE_EXT);
    let mut file = OpenOptions::new().append(true).open(&store_path).unwrap();
    file.write_all(&[0, 0, 0, 0, 0, 0, 0, 100, 1, 2]).unwrap();
    drop(file);

    let segment = open_segment(temp.path(), config);
    assert_eq!(segment.next_offset(), BASE + 3);
    assert_eq!(segment.store().size(), clean_size);
    assert_eq!(fs::metadata(&store_path).unwrap().len(), clean_size);

    assert_eq!(segment.append(b"after").unwrap(), BASE + 3);
    assert_eq!(segment.read(BASE + 3).unwrap(), b"after");
}

#[test]
fn test_reopen_rebuilds_lagging_index() {
    let temp = TempDir::new().unwrap();
    let config = segment_config(1024, 1024);
    {
        let segment = open_segment(temp.path(), config);
        fill(&segment, 3);
        segment.close().unwrap();
    }

    // The last store frame was written but its index entry was not
    let index_path = Segment::file_path(temp.path(), BASE, INDEX_EXT);
    OpenOptions::new()
        .write(true)
        .open(&index_path)
        .unwrap()
        .set_len(2 * ENTRY_WIDTH)
        .unwrap();

    let segment = open_segment(temp.path(), config);
    assert_eq!(segment.next_offset(), BASE + 3);
    assert_eq!(segment.read(BASE + 2).unwrap(), b"rec02");
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupt_frame_fences_segment() {
    let temp = TempDir::new().unwrap();
    let config = segment_config(1024, 1024);
    {
        let segment = open_segment(temp.path(), config);
        fill(&segment, 2);
        segment.close().unwrap();
    }

    // First frame now claims far more bytes than the file holds
    let store_path = Segment::file_path(temp.path(), BASE, STORE_EXT);
    let mut file = OpenOptions::new().write(true).open(&store_path).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&u64::MAX.to_be_bytes()).unwrap();
    drop(file);

    let segment = open_segment(temp.path(), config);
    assert!(!segment.is_corrupt());

    let err = segment.read(BASE).unwrap_err();
    assert!(matches!(err, LogError::Corruption(_)), "got {:?}", err);
    assert!(segment.is_corrupt());

    // The intact second frame is refused as well
    let err = segment.read(BASE + 1).unwrap_err();
    assert!(matches!(err, LogError::Corruption(_)), "got {:?}", err);
}

// =============================================================================
// Removal Tests
// =============================================================================

#[test]
fn test_remove_deletes_files() {
    let temp = TempDir::new().unwrap();
    let segment = open_segment(temp.path(), segment_config(1024, 1024));
    fill(&segment, 2);

    segment.remove().unwrap();

    assert!(!Segment::file_path(temp.path(), BASE, STORE_EXT).exists());
    assert!(!Segment::file_path(temp.path(), BASE, INDEX_EXT).exists());
}
