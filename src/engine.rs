use std::path::Path;
use std::time::Instant;

use crossbeam_channel as channel;
use tracing::{info, warn};

use crate::config::{Config, SourceKind};
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::plan::{plan, ChunkSpec};
use crate::report::Report;
use crate::scan::{FailureMark, ScanStats, Scanner};
use crate::source::{size_of, ByteSource, FileSource, MmapSource};
use crate::table::AggregateTable;

/// Aggregate the file at `path` and return the sorted report.
pub fn aggregate_file(path: &Path, config: &Config) -> Result<Report> {
    config.validate()?;
    let file_len = size_of(path)?;
    if file_len == 0 {
        return Err(Error::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    info!(path = %path.display(), bytes = file_len, source = ?config.source_kind, "aggregating");

    match config.source_kind {
        SourceKind::Pread => aggregate_source(&FileSource::open(path)?, file_len, config),
        SourceKind::Mmap => aggregate_source(&MmapSource::open(path)?, file_len, config),
    }
}

/// Aggregate the first `len` bytes of `source`.
pub fn aggregate_source<S>(source: &S, len: u64, config: &Config) -> Result<Report>
where
    S: ByteSource + ?Sized,
{
    let started = Instant::now();
    let tables = aggregate_tables(source, len, config)?;
    let workers = tables.len();
    let merged = merge(tables)?
        .unwrap_or_else(|| AggregateTable::with_capacity(config.table_capacity));
    let report = Report::from(merged);
    info!(
        workers,
        stations = report.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "aggregation finished"
    );
    Ok(report)
}

/// Scan every chunk on its own worker and return the per-worker tables in
/// chunk order, without merging them.
pub fn aggregate_tables<S>(source: &S, len: u64, config: &Config) -> Result<Vec<AggregateTable>>
where
    S: ByteSource + ?Sized,
{
    config.validate()?;
    let Some(chunks) = plan(len, config.workers, config.max_line_len) else {
        return Ok(Vec::new());
    };
    if chunks.len() < config.workers {
        warn!(
            requested = config.workers,
            actual = chunks.len(),
            "input too small for requested worker count"
        );
    }
    info!(chunks = chunks.len(), bytes = len, "planned chunks");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(chunks.len())
        .thread_name(|i| format!("brc-scan-{i}"))
        .build()?;
    let (tx, rx) = channel::bounded(chunks.len());
    let failures = &FailureMark::default();
    pool.scope(|s| {
        for chunk in &chunks {
            let tx = tx.clone();
            s.spawn(move |_| {
                let outcome = scan_chunk(source, len, chunk, config, failures);
                if outcome.is_err() {
                    failures.fail(chunk.index);
                }
                // The receiver outlives the scope.
                let _ = tx.send((chunk.index, outcome));
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<AggregateTable>> = (0..chunks.len()).map(|_| None).collect();
    let mut failure: Option<(usize, Error)> = None;
    let mut records = 0;
    for (index, outcome) in rx.iter() {
        match outcome {
            Ok((table, stats)) => {
                records += stats.records;
                slots[index] = Some(table);
            }
            Err(e) => {
                if failure.as_ref().map_or(true, |(first, _)| index < *first) {
                    failure = Some((index, e));
                }
            }
        }
    }
    if let Some((_, e)) = failure {
        return Err(e);
    }
    info!(records, "all workers joined");

    slots
        .into_iter()
        .enumerate()
        .map(|(index, table)| table.ok_or(Error::WorkerLost(index)))
        .collect()
}

fn scan_chunk<S>(
    source: &S,
    len: u64,
    chunk: &ChunkSpec,
    config: &Config,
    failures: &FailureMark,
) -> Result<(AggregateTable, ScanStats)>
where
    S: ByteSource + ?Sized,
{
    let mut table = AggregateTable::with_capacity(config.table_capacity);
    let mut scanner = Scanner::new(source, len, config.max_line_len, config.read_buffer_bytes)
        .with_failure_mark(failures);
    let stats = scanner.scan(chunk, &mut table)?;
    Ok((table, stats))
}
