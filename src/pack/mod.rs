//! IzPack pack parsing and extraction.
//!
//! An IzPack installer jar stores the files of each installable pack in
//! `resources/packs/pack-<name>`. Every such pack is one Java object
//! serialization stream holding a record count followed by, per file, a
//! serialized `PackFile` header and the raw file bytes.
//!
//! ## Architecture
//!
//! - [`serial`]: Decoder for the serialization stream (type tags, handles, block data)
//! - [`structures`]: The [`PackFile`] record mapped from a decoded object
//! - [`parser`]: Sequential record reader with exact payload accounting
//! - [`extractor`]: Prefix filter, path translation and the extraction loop
//!
//! ## Stream Layout
//!
//! 1. Stream header `AC ED 00 05`
//! 2. Record count, an `int` in a block data segment
//! 3. For each record: the header object, then `length` payload bytes as
//!    block data (none for directories and for files stored in an earlier pack)
//!
//! There is no index: records can only be reached by decoding every header
//! and consuming every payload before them.
//!
//! ## Limitations
//!
//! - No pack200 decompression of jar payloads
//! - Back-referenced files (content kept in an earlier pack) are not resolved

mod error;
mod extractor;
mod parser;
pub mod serial;
mod structures;

#[cfg(test)]
mod testutil;

pub use error::{DecodeError, PackError, Result};
pub use extractor::{
    DEFAULT_PREFIX, DEFAULT_ROOT_TOKEN, ExtractConfig, ExtractSummary, PackExtractor, run,
};
pub use parser::{COPY_BUFFER_SIZE, PackParser};
pub use structures::*;
