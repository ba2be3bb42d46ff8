//! Single-threaded line-by-line aggregation over an in-memory buffer.
//!
//! Used to check the chunked engine and as the benchmark reference point.
//! Records are accepted or rejected by the same grammar as the engine; the
//! value is then converted through a float parse instead of digit
//! arithmetic.

use ahash::AHashMap;

use crate::error::{MalformedReason, ParseError, Result};
use crate::parse::parse_record;
use crate::report::Report;
use crate::table::StationStat;

pub fn aggregate(bytes: &[u8]) -> Result<Report> {
    let mut stations: AHashMap<&[u8], StationStat> = AHashMap::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (record, next) = parse_record(bytes, pos, 0)?;
        let value = &bytes[pos + record.key.len() + 1..next - 1];
        let value: f64 = lexical_core::parse(value).map_err(|_| ParseError {
            offset: pos as u64,
            reason: MalformedReason::BadValue,
        })?;
        let tenths = (value * 10.0).round() as i32;

        stations
            .entry(record.key)
            .or_insert_with(|| StationStat::new(record.key, record.hash))
            .observe(tenths);
        pos = next;
    }

    Ok(Report::new(stations.into_iter().map(|(_, stat)| stat).collect()))
}
