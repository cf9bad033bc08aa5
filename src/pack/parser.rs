//! Sequential pack parser.
//!
//! A pack is a single forward-only stream:
//!
//! ```text
//! [int record count]
//! [PackFile header][payload]   (repeated `count` times)
//! ```
//!
//! The payload of each record must be consumed in full, by copying or
//! skipping, before the next header can be decoded. [`PackParser`] enforces
//! that ordering: a header read while payload bytes are still pending fails
//! instead of silently desynchronizing.

use std::io::{self, Read, Write};

use log::trace;

use super::error::{DecodeError, PackError, Result};
use super::serial::ObjectStream;
use super::structures::PackFile;

/// Chunk size for payload copies.
pub const COPY_BUFFER_SIZE: usize = 5120;

pub struct PackParser<R: Read> {
    stream: ObjectStream<R>,
    count: u32,
    remaining: u32,
}

impl<R: Read> PackParser<R> {
    /// Reads the stream header and the record count.
    pub fn new(reader: R) -> Result<Self> {
        let mut stream = ObjectStream::new(reader)?;
        let count = stream.read_int()?;
        if count < 0 {
            return Err(DecodeError::NegativeCount(count).into());
        }

        Ok(Self {
            stream,
            count: count as u32,
            remaining: count as u32,
        })
    }

    /// Number of records announced by the pack.
    pub fn record_count(&self) -> u32 {
        self.count
    }

    /// Decodes the next header, or `None` once every record was read.
    pub fn next_record(&mut self) -> Result<Option<PackFile>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let value = self.stream.read_object()?;
        let record = PackFile::from_value(&value)?;
        self.remaining -= 1;
        trace!(
            "record {}/{}: {}",
            self.count - self.remaining,
            self.count,
            record.target_path
        );
        Ok(Some(record))
    }

    /// Copies the payload of `record` into `out`.
    ///
    /// Reads at most [`COPY_BUFFER_SIZE`] bytes at a time and fails with
    /// [`PackError::IncompleteStream`] if the stream ends early.
    pub fn copy_payload<W: Write>(&mut self, record: &PackFile, out: &mut W) -> Result<u64> {
        let expected = record.payload_len();
        let mut buffer = [0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;

        while copied < expected {
            let max = (expected - copied).min(COPY_BUFFER_SIZE as u64) as usize;
            let read = self.stream.read_block(&mut buffer[..max])?;
            if read == 0 {
                return Err(PackError::IncompleteStream {
                    path: record.target_path.clone(),
                    expected,
                    copied,
                });
            }
            out.write_all(&buffer[..read])?;
            copied += read as u64;
        }

        Ok(copied)
    }

    /// Discards the payload of `record`.
    pub fn skip_payload(&mut self, record: &PackFile) -> Result<u64> {
        self.copy_payload(record, &mut io::sink())
    }

    pub fn get_ref(&self) -> &R {
        self.stream.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner()
    }
}
