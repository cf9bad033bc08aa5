use clap::Parser;
use std::path::PathBuf;

use crate::io::Compression;
use crate::pack::{DEFAULT_PREFIX, DEFAULT_ROOT_TOKEN, ExtractConfig};

#[derive(Parser, Debug)]
#[command(name = "izunpack")]
#[command(version)]
#[command(about = "Extract a subtree of an IzPack installer pack", long_about = None)]
#[command(after_help = "Examples:\n  \
  izunpack resources/packs/pack-Core                 extract $INSTALL_PATH/db/ into ./output\n  \
  izunpack -l resources/packs/pack-Core              list every record of the pack\n  \
  izunpack pack-Core -p '$INSTALL_PATH/lib/' -d out  extract another subtree into out")]
pub struct Cli {
    /// Pack file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = "output")]
    pub extract_dir: PathBuf,

    /// Only extract records whose target path starts with PREFIX
    #[arg(short = 'p', long, value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Path variable replaced by the output directory
    #[arg(long, value_name = "TOKEN", default_value = DEFAULT_ROOT_TOKEN)]
    pub root_token: String,

    /// Pack is zlib-deflated
    #[arg(short = 'z', long)]
    pub zlib: bool,

    /// List records (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List records verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_list(&self) -> bool {
        self.list || self.verbose
    }

    pub fn compression(&self) -> Compression {
        if self.zlib {
            Compression::Zlib
        } else {
            Compression::None
        }
    }

    pub fn to_config(&self) -> ExtractConfig {
        ExtractConfig {
            compression: self.compression(),
            prefix: self.prefix.clone(),
            root_token: self.root_token.clone(),
            quiet: self.is_quiet(),
            ..ExtractConfig::new(&self.file, &self.extract_dir)
        }
    }
}
