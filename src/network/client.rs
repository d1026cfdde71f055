//! TCP Client
//!
//! Blocking client for the produce/consume protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{LogError, Result};
use crate::protocol::{read_response, write_request, Request, Response};

/// A connection to a proglog server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| LogError::Network(e.to_string()))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Append a record, returning its offset
    pub fn produce(&mut self, record: &[u8]) -> Result<u64> {
        let response = self.call(&Request::Produce {
            record: record.to_vec(),
        })?;
        response.as_offset()
    }

    /// Read the record at `offset`
    pub fn consume(&mut self, offset: u64) -> Result<Vec<u8>> {
        let response = self.call(&Request::Consume { offset })?;
        Ok(response.payload.unwrap_or_default())
    }

    /// Retained offset range as `(lowest, next)`
    pub fn offsets(&mut self) -> Result<(u64, u64)> {
        self.call(&Request::Offsets)?.as_offsets()
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(&Request::Ping)?;
        Ok(())
    }

    /// Send a request and wait for an OK response
    fn call(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        let response = read_response(&mut self.reader)?;
        let status = response.status;
        let payload = response.into_result()?;
        Ok(Response { status, payload })
    }
}
