use std::sync::atomic::{AtomicUsize, Ordering};

use memchr::memrchr;
use tracing::debug;

use crate::error::{Error, MalformedReason, ParseError, Result};
use crate::parse::parse_all;
use crate::plan::ChunkSpec;
use crate::source::{read_full, ByteSource};
use crate::table::AggregateTable;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub records: u64,
    pub batches: u64,
    pub bytes_read: u64,
}

/// Lowest index of a chunk that has failed, shared by the workers of one run.
///
/// A chunk stops at its next batch once an earlier chunk has failed. Chunks
/// before the failure keep scanning, so the earliest failure still surfaces.
#[derive(Debug)]
pub struct FailureMark(AtomicUsize);

impl Default for FailureMark {
    fn default() -> Self {
        FailureMark(AtomicUsize::new(usize::MAX))
    }
}

impl FailureMark {
    pub fn fail(&self, chunk: usize) {
        self.0.fetch_min(chunk, Ordering::Relaxed);
    }

    pub fn is_superseded(&self, chunk: usize) -> bool {
        self.0.load(Ordering::Relaxed) < chunk
    }
}

/// Reads one chunk at a time through a fixed buffer and feeds whole lines
/// to the parser.
///
/// A chunk other than the first is read from `max_line_len` bytes before
/// its nominal start. Everything up to the last newline of that lookback
/// window belongs to the previous chunk and is skipped. Within each batch
/// only bytes up to the last newline are parsed; the trailing fragment is
/// moved to the front of the buffer and completed by the next read. The
/// fragment left over after the last batch belongs to the next chunk,
/// except at end of input where it is parsed as a final record.
pub struct Scanner<'a, S: ?Sized> {
    source: &'a S,
    file_len: u64,
    max_line_len: usize,
    buf: Vec<u8>,
    failures: Option<&'a FailureMark>,
}

impl<'a, S: ByteSource + ?Sized> Scanner<'a, S> {
    /// `buffer_bytes` must be at least twice `max_line_len`.
    pub fn new(source: &'a S, file_len: u64, max_line_len: usize, buffer_bytes: usize) -> Self {
        debug_assert!(buffer_bytes >= 2 * max_line_len);
        Self {
            source,
            file_len,
            max_line_len,
            buf: vec![0u8; buffer_bytes],
            failures: None,
        }
    }

    /// Give up between batches once an earlier chunk is marked failed.
    pub fn with_failure_mark(mut self, failures: &'a FailureMark) -> Self {
        self.failures = Some(failures);
        self
    }

    pub fn scan(&mut self, chunk: &ChunkSpec, table: &mut AggregateTable) -> Result<ScanStats> {
        let lookback = chunk.start.min(self.max_line_len as u64) as usize;
        let at_eof = chunk.end() >= self.file_len;
        let mut offset = chunk.start - lookback as u64;
        let mut remaining = chunk.len + lookback as u64;
        let mut skip_lookback = lookback > 0;
        let mut carried = 0;
        let mut stats = ScanStats::default();

        while remaining > 0 {
            if self.failures.is_some_and(|f| f.is_superseded(chunk.index)) {
                return Err(Error::Superseded(chunk.index));
            }
            let room = self.buf.len() - carried;
            let amount = usize::try_from(remaining).map_or(room, |r| r.min(room));
            let n = read_full(self.source, offset, &mut self.buf[carried..carried + amount])
                .map_err(|e| {
                    Error::io(format!("read chunk {} at byte {offset}", chunk.index), e)
                })?;
            if n < amount {
                return Err(Error::TruncatedInput {
                    chunk: chunk.index,
                    offset: offset + n as u64,
                });
            }
            // File offset of buf[0].
            let base = offset - carried as u64;
            offset += n as u64;
            remaining -= n as u64;
            stats.batches += 1;
            stats.bytes_read += n as u64;

            let filled = carried + n;
            let window = &self.buf[..filled];
            let last_batch = remaining == 0;

            let start = if skip_lookback {
                skip_lookback = false;
                match memrchr(b'\n', &window[..lookback]) {
                    Some(i) => i + 1,
                    // The window reaches back to the start of the input.
                    None if base == 0 => 0,
                    None => return Err(line_too_long(base)),
                }
            } else {
                0
            };

            let end = if last_batch && at_eof {
                filled
            } else {
                match memrchr(b'\n', &window[start..]) {
                    Some(i) => start + i + 1,
                    // The record continues into the next chunk.
                    None if last_batch => start,
                    None => return Err(line_too_long(base + start as u64)),
                }
            };

            stats.records += parse_all(&window[start..end], base + start as u64, table)?;

            carried = filled - end;
            if !last_batch && carried >= self.max_line_len {
                return Err(line_too_long(base + end as u64));
            }
            self.buf.copy_within(end..filled, 0);
        }

        debug!(
            chunk = chunk.index,
            start = chunk.start,
            len = chunk.len,
            records = stats.records,
            batches = stats.batches,
            bytes_read = stats.bytes_read,
            "chunk scanned"
        );
        Ok(stats)
    }
}

fn line_too_long(offset: u64) -> Error {
    Error::MalformedRecord(ParseError {
        offset,
        reason: MalformedReason::LineTooLong,
    })
}
