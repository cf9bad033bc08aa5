use std::io;

use thiserror::Error;

/// Malformed or unsupported content in the serialized header stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("type tag 0x{tag:02x} not allowed in {context}")]
    UnexpectedTag { tag: u8, context: &'static str },
    #[error("bad stream magic 0x{0:04x}")]
    BadMagic(u16),
    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u16),
    #[error("invalid handle 0x{0:x}")]
    InvalidHandle(u32),
    #[error("invalid field type code {0:?}")]
    InvalidTypeCode(char),
    #[error("negative length {0}")]
    NegativeLength(i64),
    #[error("negative record count {0}")]
    NegativeCount(i32),
    #[error("malformed modified UTF-8 string")]
    MalformedString,
    #[error("{0} unread bytes of block data before object")]
    UnexpectedBlockData(usize),
    #[error("unsupported stream content: {0}")]
    Unsupported(String),
    #[error("objects nested deeper than {0} levels")]
    TooDeep(usize),
    #[error("expected {expected}, found {found}")]
    UnexpectedClass { expected: &'static str, found: String },
    #[error("field `{0}` missing or of the wrong type")]
    MissingField(&'static str),
}

#[derive(Error, Debug)]
pub enum PackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("incomplete stream for {path}: expected {expected} bytes, got {copied} (installer corrupted?)")]
    IncompleteStream {
        path: String,
        expected: u64,
        copied: u64,
    },
    #[error("target path {0} does not map below the output root")]
    UnsafePath(String),
    #[error(transparent)]
    IOError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PackError>;

/// Maps a short read inside the header stream to a decode error.
pub(crate) fn truncated(err: io::Error) -> PackError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof.into()
    } else {
        err.into()
    }
}
