use std::env;
use std::str::FromStr;
use std::thread;

use crate::error::ConfigError;
use crate::MAX_LINE_LEN;

pub const DEFAULT_READ_BUFFER_BYTES: usize = 1 << 23;
pub const DEFAULT_TABLE_CAPACITY: usize = 1 << 15;
/// Every worker holds its own read buffer and table for the whole scan.
pub const MAX_WORKERS: usize = 1024;

/// Shortest record the grammar allows: `k;0.0\n`.
const MIN_LINE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Positional reads on one shared file handle.
    Pread,
    /// Copy batches out of a read-only memory map.
    Mmap,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pread" => Ok(SourceKind::Pread),
            "mmap" => Ok(SourceKind::Mmap),
            other => Err(format!("unknown source kind {other:?}, expected pread or mmap")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workers: usize,
    pub read_buffer_bytes: usize,
    pub table_capacity: usize,
    pub max_line_len: usize,
    pub source_kind: SourceKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(1, |n| n.get().min(MAX_WORKERS)),
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            table_capacity: DEFAULT_TABLE_CAPACITY,
            max_line_len: MAX_LINE_LEN,
            source_kind: SourceKind::Pread,
        }
    }
}

impl Config {
    /// Defaults overridden by `BRC_WORKERS`, `BRC_READ_BUFFER_BYTES`,
    /// `BRC_TABLE_CAPACITY` and `BRC_SOURCE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(workers) = parse_var(&lookup, "BRC_WORKERS")? {
            config.workers = workers;
        }
        if let Some(bytes) = parse_var(&lookup, "BRC_READ_BUFFER_BYTES")? {
            config.read_buffer_bytes = bytes;
        }
        if let Some(capacity) = parse_var(&lookup, "BRC_TABLE_CAPACITY")? {
            config.table_capacity = capacity;
        }
        if let Some(kind) = parse_var(&lookup, "BRC_SOURCE")? {
            config.source_kind = kind;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.workers > MAX_WORKERS {
            return Err(ConfigError::TooManyWorkers {
                workers: self.workers,
                max: MAX_WORKERS,
            });
        }
        if !self.table_capacity.is_power_of_two() {
            return Err(ConfigError::TableCapacity(self.table_capacity));
        }
        if self.max_line_len < MIN_LINE_LEN {
            return Err(ConfigError::MaxLineLen(self.max_line_len));
        }
        let required = self.max_line_len * 2;
        if self.read_buffer_bytes < required {
            return Err(ConfigError::ReadBuffer {
                buffer: self.read_buffer_bytes,
                required,
            });
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Env {
            name,
            value,
            reason: e.to_string(),
        })
}
