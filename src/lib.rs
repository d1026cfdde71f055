//! # proglog
//!
//! A durable, append-only commit log with:
//! - Length-prefixed record stores
//! - Memory-mapped offset → position indexes
//! - Segment rotation on size limits and truncation of old segments
//! - Index reconciliation after unclean shutdown
//! - TCP-based produce/consume protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    LogService                                │
//! │              (Produce / Consume / Offsets)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Log                                    │
//! │         (single appender, concurrent readers)                │
//! └──────┬───────────────────┬───────────────────┬──────────────┘
//!        ▼                   ▼                   ▼
//!   ┌─────────┐         ┌─────────┐         ┌─────────┐
//!   │ Segment │         │ Segment │   ...   │ Segment │ (active)
//!   │ store   │         │ store   │         │ store   │
//!   │ index   │         │ index   │         │ index   │
//!   └─────────┘         └─────────┘         └─────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod log;
pub mod protocol;
pub mod service;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig, SyncStrategy};
pub use log::Log;
pub use service::LogService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of proglog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
