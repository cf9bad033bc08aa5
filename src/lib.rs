//! # izunpack
//!
//! Selective extractor for IzPack installer packs.
//!
//! An IzPack pack is a forward-only stream of serialized file headers, each
//! followed by the file's bytes. This library decodes the headers, writes
//! the files whose target path falls under a chosen prefix into an output
//! directory, and skips everything else.
//!
//! ## Features
//!
//! - Decode the Java object serialization stream a pack is written in
//! - Extract a subtree (default `$INSTALL_PATH/db/`) below an output root
//! - List every record of a pack with its size, mtime and provenance
//! - Read plain or zlib-deflated packs
//!
//! ## Example
//!
//! ```no_run
//! use izunpack::{ExtractConfig, run};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ExtractConfig::new("temp/resources/packs/pack-Core", "output");
//!     let summary = run(&config)?;
//!     println!("{} files written", summary.files);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod pack;

pub use cli::Cli;
pub use io::{Compression, CountingReader, LocalPackReader};
pub use pack::{ExtractConfig, ExtractSummary, PackExtractor, PackFile, PackParser, run};
