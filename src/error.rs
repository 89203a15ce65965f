use std::{fmt::Display, io};

use thiserror::Error;

use crate::bundle::BundleVersion;

/// Which part of a bundle was being read when a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Meta,
    /// Setting up the chunk stream after the meta block, or pulling it into memory up front
    Stream,
    Directory,
    Resources,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Meta => "meta",
            Stage::Stream => "stream",
            Stage::Directory => "directory",
            Stage::Resources => "resources",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input violates the format
    Malformed,
    /// The input may be valid, but this reader can't handle it as configured
    Unsupported,
    /// A lookup missed
    NotFound,
    /// Ran out of bytes mid-value
    EndOfData,
    Io,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("unexpected end of data")]
    EndOfData,

    #[error("source is too small to be a bundle: {len} bytes")]
    TooSmall { len: u64 },

    #[error("unsupported bundle version {0:#010x}")]
    UnsupportedVersion(u32),

    #[error("bundle version {0} needs a codec dictionary, but none was provided")]
    MissingDictionary(BundleVersion),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid chunk length {length} at offset {offset:#x} (max {max})")]
    InvalidChunkLength { offset: u64, length: i64, max: usize },

    #[error("{codec} decompression failed: {message}")]
    Decompression {
        codec: &'static str,
        message: String,
    },

    #[error("chunk index {index} out of range ({count} chunks)")]
    OutOfRange { index: usize, count: usize },

    #[error("hash {0} not found")]
    NotFound(String),

    #[error("hash {0} already exists")]
    AlreadyExists(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to read bundle {stage}: {source}")]
    Parse {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData(message.into())
    }

    /// The innermost error, looking through stage context
    pub fn root(&self) -> &Error {
        match self {
            Error::Parse { source, .. } => source.root(),
            e => e,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self.root() {
            Io(_) => ErrorKind::Io,
            EndOfData => ErrorKind::EndOfData,
            TooSmall { .. } | InvalidData(_) | InvalidChunkLength { .. } | Decompression { .. } => {
                ErrorKind::Malformed
            }
            UnsupportedVersion(_) | MissingDictionary(_) => ErrorKind::Unsupported,
            OutOfRange { .. } | NotFound(_) => ErrorKind::NotFound,
            AlreadyExists(_) => ErrorKind::Malformed,
            Cancelled => ErrorKind::Cancelled,
            Parse { .. } => unreachable!("root() never returns a Parse error"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::EndOfData,
            // Errors surfaced through ChunkStream's Read impl come back unwrapped
            _ if e.get_ref().is_some_and(|inner| inner.is::<Error>()) => {
                match e.into_inner().map(|inner| inner.downcast::<Error>()) {
                    Some(Ok(inner)) => *inner,
                    _ => unreachable!("checked above"),
                }
            }
            _ => Error::Io(e),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            Error::EndOfData => io::ErrorKind::UnexpectedEof.into(),
            Error::Cancelled => io::Error::new(io::ErrorKind::Interrupted, e),
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a parse stage to a result
pub(crate) trait StageContext<T> {
    fn stage(self, stage: Stage) -> Result<T>;
}

impl<T, E: Into<Error>> StageContext<T> for std::result::Result<T, E> {
    fn stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| Error::Parse {
            stage,
            source: Box::new(e.into()),
        })
    }
}
