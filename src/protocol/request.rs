//! Request definitions
//!
//! Represents requests from clients.

/// Request types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestType {
    Produce = 0x01,
    Consume = 0x02,
    Offsets = 0x03,
    Ping = 0x04,
}

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Append a record to the log
    Produce { record: Vec<u8> },

    /// Read the record at an offset
    Consume { offset: u64 },

    /// Ask for the retained offset range
    Offsets,

    /// Ping (health check)
    Ping,
}

impl Request {
    /// Get the request type
    pub fn request_type(&self) -> RequestType {
        match self {
            Request::Produce { .. } => RequestType::Produce,
            Request::Consume { .. } => RequestType::Consume,
            Request::Offsets => RequestType::Offsets,
            Request::Ping => RequestType::Ping,
        }
    }
}
