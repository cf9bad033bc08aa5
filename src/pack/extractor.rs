use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};

use crate::io::{Compression, CountingReader, LocalPackReader};

use super::error::{PackError, Result};
use super::parser::PackParser;
use super::structures::PackFile;

/// Subtree extracted when no prefix is given
pub const DEFAULT_PREFIX: &str = "$INSTALL_PATH/db/";

/// Installer variable every target path starts with
pub const DEFAULT_ROOT_TOKEN: &str = "$INSTALL_PATH";

/// Extraction settings, fixed at startup
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub archive: PathBuf,
    pub compression: Compression,
    pub output_root: PathBuf,
    /// Only records whose target path starts with this are written
    pub prefix: String,
    /// Leading part of target paths replaced by `output_root`
    pub root_token: String,
    /// Suppress progress output on stdout
    pub quiet: bool,
}

impl ExtractConfig {
    pub fn new(archive: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            compression: Compression::None,
            output_root: output_root.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            root_token: DEFAULT_ROOT_TOKEN.to_string(),
            quiet: false,
        }
    }
}

/// Counters collected while extracting a pack
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub records: u32,
    pub directories: u32,
    pub files: u32,
    pub bytes_written: u64,
    pub skipped: u32,
    /// Matching files whose content lives in an earlier pack
    pub back_references: u32,
    /// Bytes consumed from the (decompressed) pack stream
    pub stream_bytes: u64,
}

/// Pack extractor
pub struct PackExtractor<'a> {
    config: &'a ExtractConfig,
}

impl<'a> PackExtractor<'a> {
    pub fn new(config: &'a ExtractConfig) -> Self {
        Self { config }
    }

    /// Open the configured archive
    pub fn open(&self) -> Result<LocalPackReader> {
        let reader = LocalPackReader::new(&self.config.archive, self.config.compression)?;
        debug!(
            "opened {} ({} bytes, {:?})",
            self.config.archive.display(),
            reader.size(),
            self.config.compression
        );
        Ok(reader)
    }

    /// Open the configured archive and extract the matching records
    pub fn run(&self) -> Result<ExtractSummary> {
        let reader = self.open()?;
        self.extract(reader)
    }

    /// Extract matching records from a pack stream.
    ///
    /// Stops at the first error. Files written for earlier records are kept.
    pub fn extract<R: Read>(&self, reader: R) -> Result<ExtractSummary> {
        let mut parser = PackParser::new(CountingReader::new(reader))?;
        let mut summary = ExtractSummary::default();

        info!("{} records in pack", parser.record_count());
        if !self.config.quiet {
            println!("records: {}", parser.record_count());
        }

        while let Some(record) = parser.next_record()? {
            summary.records += 1;
            debug!(
                "{}: {} bytes, header ends at {}",
                record.target_path,
                record.length,
                parser.get_ref().position()
            );
            self.dispose(&mut parser, &record, &mut summary)?;
        }

        summary.stream_bytes = parser.get_ref().position();
        info!(
            "{} files, {} directories, {} bytes written, {} records skipped",
            summary.files, summary.directories, summary.bytes_written, summary.skipped
        );
        Ok(summary)
    }

    /// Read every record header of a pack stream, skipping all payloads
    pub fn list<R: Read>(&self, reader: R) -> Result<Vec<PackFile>> {
        let mut parser = PackParser::new(reader)?;
        let mut records = Vec::with_capacity(parser.record_count().min(4096) as usize);
        while let Some(record) = parser.next_record()? {
            parser.skip_payload(&record)?;
            records.push(record);
        }
        Ok(records)
    }

    /// Whether `record` falls under the configured prefix
    pub fn matches(&self, record: &PackFile) -> bool {
        record.target_path.starts_with(&self.config.prefix)
    }

    /// Map a target path onto the output root.
    ///
    /// `$INSTALL_PATH/db/x.dat` becomes `<output_root>/db/x.dat`. Paths that
    /// do not start with the root token, or that contain `..` or rooted
    /// components, are rejected.
    pub fn output_path(&self, target_path: &str) -> Result<PathBuf> {
        let unsafe_path = || PackError::UnsafePath(target_path.to_string());

        let rest = target_path
            .strip_prefix(self.config.root_token.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with(['/', '\\']))
            .ok_or_else(unsafe_path)?;

        let mut path = self.config.output_root.clone();
        for part in rest.split(['/', '\\']) {
            if part.is_empty() || part == "." {
                continue;
            }
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(part),
                _ => return Err(unsafe_path()),
            }
        }
        Ok(path)
    }

    fn dispose<R: Read>(
        &self,
        parser: &mut PackParser<R>,
        record: &PackFile,
        summary: &mut ExtractSummary,
    ) -> Result<()> {
        if !self.matches(record) {
            parser.skip_payload(record)?;
            summary.skipped += 1;
            return Ok(());
        }

        if !self.config.quiet {
            println!("{}", record.target_path);
            println!("  length: {}", record.length);
            println!(
                "  previous pack: {}",
                record.previous_pack_id.as_deref().unwrap_or("-")
            );
        }

        if record.is_directory {
            let path = self.output_path(&record.target_path)?;
            fs::create_dir_all(&path)?;
            parser.skip_payload(record)?;
            summary.directories += 1;
        } else if let Some(pack) = &record.previous_pack_id {
            warn!(
                "{} is stored in pack {} at offset {}, not extracted",
                record.target_path, pack, record.offset_in_previous_pack
            );
            parser.skip_payload(record)?;
            summary.back_references += 1;
        } else {
            let path = self.output_path(&record.target_path)?;
            summary.bytes_written += self.write_file(parser, record, &path)?;
            summary.files += 1;
        }
        Ok(())
    }

    fn write_file<R: Read>(
        &self,
        parser: &mut PackParser<R>,
        record: &PackFile,
        path: &Path,
    ) -> Result<u64> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        match parser.copy_payload(record, &mut file) {
            Ok(copied) => Ok(copied),
            Err(err) => {
                drop(file);
                if let Err(e) = fs::remove_file(path) {
                    warn!("could not remove partial file {}: {e}", path.display());
                }
                Err(err)
            }
        }
    }
}

/// Extract the archive described by `config`
pub fn run(config: &ExtractConfig) -> Result<ExtractSummary> {
    PackExtractor::new(config).run()
}
