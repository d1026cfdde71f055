//! Log Reader
//!
//! Streams the raw store bytes (length-prefixed frames) of a whole log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Take};

use crate::error::Result;

use super::store::Store;

/// Sequential reader over the store files of every segment, oldest first
///
/// Each store is captured at the size it had when the reader was created;
/// records appended afterwards are not included.
pub struct LogReader {
    readers: VecDeque<Take<File>>,
}

impl LogReader {
    pub(crate) fn new<'a>(stores: impl Iterator<Item = &'a Store>) -> Result<Self> {
        let mut readers = VecDeque::new();
        for store in stores {
            store.flush()?;
            let file = File::open(store.path())?;
            readers.push_back(file.take(store.size()));
        }
        Ok(Self { readers })
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while let Some(reader) = self.readers.front_mut() {
            let n = reader.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            self.readers.pop_front();
        }
        Ok(0)
    }
}
