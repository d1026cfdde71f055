//! Service Module
//!
//! Stateless translation layer between client requests and the log.
//!
//! ## Responsibilities
//! - Map Produce/Consume onto `Log::append` / `Log::read`
//! - Turn log errors into client-facing status codes:
//!   missing offsets become NOT_FOUND, transient I/O becomes ERROR,
//!   everything else (corruption, closed log) becomes FATAL

use std::sync::Arc;

use crate::error::Result;
use crate::log::Log;
use crate::protocol::{Request, Response};

/// Produce/Consume API over a shared log
#[derive(Clone)]
pub struct LogService {
    log: Arc<Log>,
}

impl LogService {
    pub fn new(log: Arc<Log>) -> Self {
        Self { log }
    }

    /// Append a record, returning its offset
    pub fn produce(&self, record: &[u8]) -> Result<u64> {
        let offset = self.log.append(record)?;
        tracing::trace!("Produced {} bytes at offset {}", record.len(), offset);
        Ok(offset)
    }

    /// Read the record at `offset`
    pub fn consume(&self, offset: u64) -> Result<Vec<u8>> {
        self.log.read(offset)
    }

    /// Retained offset range as `(lowest, next)`
    pub fn offsets(&self) -> (u64, u64) {
        (self.log.lowest_offset(), self.log.next_offset())
    }

    /// Execute a request
    ///
    /// Routes requests to appropriate handlers; never fails, errors are
    /// carried in the response status.
    pub fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::Produce { record } => self.produce(&record).map(Response::offset),
            Request::Consume { offset } => self.consume(offset).map(Response::record),
            Request::Offsets => {
                let (lowest, next) = self.offsets();
                Ok(Response::offsets(lowest, next))
            }
            Request::Ping => Ok(Response::ok(Some(b"PONG".to_vec()))),
        };

        result.unwrap_or_else(|e| {
            if e.is_not_found() {
                tracing::debug!("Request failed: {}", e);
            } else {
                tracing::warn!("Request failed: {}", e);
            }
            Response::from_error(&e)
        })
    }

    /// The underlying log
    pub fn log(&self) -> &Arc<Log> {
        &self.log
    }
}
