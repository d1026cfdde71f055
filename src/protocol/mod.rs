//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Requests
//! - 0x01: PRODUCE - Payload: record bytes
//! - 0x02: CONSUME - Payload: offset (8, big-endian)
//! - 0x03: OFFSETS - Payload: empty
//! - 0x04: PING    - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK        - offset (8) / record / lowest (8) + next (8)
//! - 0x01: NOT_FOUND - message
//! - 0x02: ERROR     - message, retry may help
//! - 0x03: FATAL     - message, retry will not help

mod request;
mod response;
mod codec;

pub use request::{Request, RequestType};
pub use response::{Response, Status};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
