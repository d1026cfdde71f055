//! Log Module
//!
//! Durable, append-only record storage split into segments.
//!
//! ## Responsibilities
//! - Assign each record a monotonically increasing offset
//! - Persist records in length-prefixed store files
//! - Map offsets to store positions through memory-mapped indexes
//! - Rotate segments on size limits, truncate old segments on request
//! - Reconcile index and store after an unclean shutdown
//!
//! ## File Format
//! Each segment is a pair of files named by its base offset.
//! ```text
//! {base}.store                         {base}.index
//! ┌──────────┬──────────────┐          ┌─────────────┬──────────────┐
//! │ Len (8)  │ Payload      │          │ RelOff (4)  │ Position (8) │
//! ├──────────┼──────────────┤          ├─────────────┼──────────────┤
//! │ Len (8)  │ Payload      │          │ RelOff (4)  │ Position (8) │
//! └──────────┴──────────────┘          └─────────────┴──────────────┘
//! ```
//! All integers are big-endian.

mod store;
mod index;
mod segment;
mod reader;
mod commit_log;

pub use store::{Store, StoreFile, LEN_WIDTH};
pub use index::{Index, ENTRY_WIDTH, OFFSET_WIDTH, POSITION_WIDTH};
pub use segment::{Segment, INDEX_EXT, STORE_EXT};
pub use reader::LogReader;
pub use commit_log::Log;
