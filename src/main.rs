//! Main entry point for the izunpack CLI application.
//!
//! This binary extracts one subtree of an IzPack installer pack into a local
//! directory, or lists the records of a pack.

use anyhow::{Context, Result};
use clap::Parser;

use izunpack::{Cli, ExtractConfig, PackExtractor, PackFile};

/// Application entry point.
///
/// Any error aborts the run; `main` returning it prints the error chain and
/// exits with a non-zero status.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    run_cli(Cli::parse())
}

/// Extract or list the pack named on the command line
fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.to_config();

    if cli.is_list() {
        return list_records(&config, cli.verbose);
    }

    let summary = izunpack::run(&config)
        .with_context(|| format!("failed to extract {}", config.archive.display()))?;

    if !cli.is_quiet() {
        println!(
            "\n{} files ({}), {} directories extracted to {}",
            summary.files,
            format_size(summary.bytes_written),
            summary.directories,
            config.output_root.display()
        );
        println!(
            "{} of {} records skipped, {} stored in earlier packs",
            summary.skipped, summary.records, summary.back_references
        );
    }

    Ok(())
}

/// List the records of the pack.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just target paths, one per line
/// - Verbose format (`-v`): Table with length, mtime, kind and provenance
fn list_records(config: &ExtractConfig, verbose: bool) -> Result<()> {
    let extractor = PackExtractor::new(config);
    let reader = extractor
        .open()
        .with_context(|| format!("failed to open {}", config.archive.display()))?;
    let records = extractor
        .list(reader)
        .with_context(|| format!("failed to read {}", config.archive.display()))?;

    if !verbose {
        for record in &records {
            println!("{}", record.target_path);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:<4}  {:<10}  Name",
        "Length", "Date", "Time", "Type", "Source"
    );
    println!("{}", "-".repeat(70));

    let mut total = 0u64;
    let mut file_count = 0usize;
    for record in &records {
        let (date, time) = format_mtime(record);
        let kind = if record.is_directory { "dir" } else { "file" };
        let source = record.previous_pack_id.as_deref().unwrap_or("-");
        println!(
            "{:>10}  {:>10}  {:>5}  {:<4}  {:<10}  {}",
            record.length, date, time, kind, source, record.target_path
        );

        if !record.is_directory {
            total += record.length;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!("{:>10}  {:>47}  {} files", total, "", file_count);
    Ok(())
}

/// Format the record mtime as `(YYYY-MM-DD, HH:MM)`, dashes when unknown.
fn format_mtime(record: &PackFile) -> (String, String) {
    match record.mtime_utc() {
        Some(mtime) => (
            mtime.format("%Y-%m-%d").to_string(),
            mtime.format("%H:%M").to_string(),
        ),
        None => ("-".to_string(), "-".to_string()),
    }
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
