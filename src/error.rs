use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input {} is unavailable: {source}", .path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input {} is empty", .path.display())]
    EmptyInput { path: PathBuf },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("input ended at byte {offset} before chunk {chunk} was fully read")]
    TruncatedInput { chunk: usize, offset: u64 },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("worker {0} exited without reporting a result")]
    WorkerLost(usize),
    #[error("chunk {0} stopped after an earlier chunk failed")]
    Superseded(usize),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    MalformedRecord(#[from] ParseError),
    #[error(transparent)]
    TableOverflow(#[from] TableError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("worker count {workers} exceeds the limit of {max}")]
    TooManyWorkers { workers: usize, max: usize },
    #[error("table capacity {0} must be a non-zero power of two")]
    TableCapacity(usize),
    #[error("max line length {0} is below the shortest possible record")]
    MaxLineLen(usize),
    #[error("read buffer of {buffer} bytes must hold at least {required} bytes")]
    ReadBuffer { buffer: usize, required: usize },
    #[error("{name}={value:?} is not valid: {reason}")]
    Env {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record at byte {offset}: {reason}")]
pub struct ParseError {
    pub offset: u64,
    pub reason: MalformedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing ';' delimiter")]
    MissingDelimiter,
    #[error("empty station name")]
    EmptyKey,
    #[error("station name longer than {} bytes", crate::MAX_KEY_LEN)]
    KeyTooLong,
    #[error("value does not match -?D{{1,2}}.D")]
    BadValue,
    #[error("record longer than the maximum line length")]
    LineTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("aggregate table is full ({capacity} slots); raise BRC_TABLE_CAPACITY")]
    Overflow { capacity: usize },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}
