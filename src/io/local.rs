use flate2::read::ZlibDecoder;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// How the pack bytes are stored on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Raw stream, as found in `resources/packs/` of an installer jar
    #[default]
    None,
    /// Pack written through a zlib `DeflaterOutputStream`
    Zlib,
}

/// Local pack file opened for sequential reading
pub struct LocalPackReader {
    inner: Box<dyn Read>,
    size: u64,
}

impl LocalPackReader {
    pub fn new(path: &Path, compression: Compression) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let buffered = BufReader::new(file);

        let inner: Box<dyn Read> = match compression {
            Compression::None => Box::new(buffered),
            Compression::Zlib => Box::new(ZlibDecoder::new(buffered)),
        };
        Ok(Self { inner, size })
    }

    /// Size of the file on disk (before decompression)
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Read for LocalPackReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
