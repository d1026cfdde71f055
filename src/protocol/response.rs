//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{LogError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    /// The requested offset does not exist; retrying will not help
    NotFound = 0x01,
    /// Transient failure (I/O); a retry may succeed
    Error = 0x02,
    /// Permanent failure (corruption, closed log); a retry will not help
    Fatal = 0x03,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (offset, record, or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK response carrying an assigned offset
    pub fn offset(offset: u64) -> Self {
        Self::ok(Some(offset.to_be_bytes().to_vec()))
    }

    /// OK response carrying a record
    pub fn record(record: Vec<u8>) -> Self {
        Self::ok(Some(record))
    }

    /// OK response carrying the retained range `[lowest, next)`
    pub fn offsets(lowest: u64, next: u64) -> Self {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&lowest.to_be_bytes());
        payload.extend_from_slice(&next.to_be_bytes());
        Self::ok(Some(payload))
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: &str) -> Self {
        Self {
            status: Status::NotFound,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create a FATAL response
    pub fn fatal(message: &str) -> Self {
        Self {
            status: Status::Fatal,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Map a log error onto the status a client should see
    pub fn from_error(error: &LogError) -> Self {
        let message = error.to_string();
        if error.is_not_found() {
            Self::not_found(&message)
        } else if error.is_retryable() {
            Self::error(&message)
        } else {
            Self::fatal(&message)
        }
    }

    /// Whether a client should consider retrying
    pub fn is_retryable(&self) -> bool {
        self.status == Status::Error
    }

    /// Turn a non-OK response back into an error
    pub fn into_result(self) -> Result<Option<Vec<u8>>> {
        let status = self.status;
        if status == Status::Ok {
            return Ok(self.payload);
        }

        let message = self
            .payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default();
        Err(match status {
            Status::NotFound => LogError::NotFound(message),
            Status::Error => LogError::Server {
                message,
                retryable: true,
            },
            Status::Ok | Status::Fatal => LogError::Server {
                message,
                retryable: false,
            },
        })
    }

    /// Decode the payload of a Produce response
    pub fn as_offset(&self) -> Result<u64> {
        let bytes = self.payload.as_deref().unwrap_or_default();
        let bytes: [u8; 8] = bytes.try_into().map_err(|_| {
            LogError::Protocol(format!("expected 8-byte offset, got {} bytes", bytes.len()))
        })?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Decode the payload of an Offsets response
    pub fn as_offsets(&self) -> Result<(u64, u64)> {
        let bytes = self.payload.as_deref().unwrap_or_default();
        if bytes.len() != 16 {
            return Err(LogError::Protocol(format!(
                "expected 16-byte offset range, got {} bytes",
                bytes.len()
            )));
        }
        let mut lowest = [0u8; 8];
        let mut next = [0u8; 8];
        lowest.copy_from_slice(&bytes[..8]);
        next.copy_from_slice(&bytes[8..]);
        Ok((u64::from_be_bytes(lowest), u64::from_be_bytes(next)))
    }
}
