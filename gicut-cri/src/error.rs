use std::io;
use thiserror::Error;

/// The Errors that may occur while demultiplexing or decrypting a stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Chunk header describes a payload that cannot exist.
    #[error(
        "invalid chunk: data size {data_size}, data offset {data_offset}, padding size {padding_size}"
    )]
    InvalidChunk {
        data_size: u32,
        data_offset: u8,
        padding_size: u16,
    },

    /// Input stream ended before a complete structure could be read.
    #[error("stream ended too early, expected {expected} bytes, read {actual}")]
    UnexpectedEof { expected: usize, actual: usize },

    /// Audio stream does not start with the `HCA` magic.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Audio header contains a sub-block tag which is not understood.
    #[error("invalid header: unknown block {}", tag_name(.0))]
    UnknownHeaderBlock(u32),

    #[error("invalid header: block size is zero")]
    BlockSizeIsZero,

    #[error("invalid header: unknown cipher type {0}")]
    UnknownCipherType(u16),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns true if the error comes from the underlying stream rather than its content.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Cancelled)
    }
}

fn tag_name(tag: &u32) -> String {
    crate::hca::tag_to_string(*tag)
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(error) => error,
            Error::UnexpectedEof { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, error),
            error => io::Error::other(error),
        }
    }
}
