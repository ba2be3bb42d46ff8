use std::fmt;
use std::io::{self, Write};

use rayon::slice::ParallelSliceMut;

use crate::table::{AggregateTable, StationStat};

/// Merged statistics sorted by station name.
#[derive(Debug)]
pub struct Report {
    entries: Vec<StationStat>,
}

impl Report {
    /// Entries that were never observed are dropped.
    pub fn new(mut entries: Vec<StationStat>) -> Self {
        entries.retain(|stat| stat.count > 0);
        // Byte-wise slice order: a name sorts before any name it prefixes.
        entries.par_sort_unstable_by(|a, b| a.key().cmp(b.key()));
        Self { entries }
    }

    pub fn entries(&self) -> &[StationStat] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `{name=min/mean/max, ...}` with raw name bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"{")?;
        for (i, stat) in self.entries.iter().enumerate() {
            if i > 0 {
                w.write_all(b", ")?;
            }
            w.write_all(stat.key())?;
            write!(
                w,
                "={}/{}/{}",
                Tenths(stat.min as i64),
                Tenths(stat.mean_tenths()),
                Tenths(stat.max as i64)
            )?;
        }
        w.write_all(b"}")
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 32 + 2);
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }
}

impl From<AggregateTable> for Report {
    fn from(table: AggregateTable) -> Self {
        Report::new(table.into_entries())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Fixed-point tenths rendered with one fractional digit.
struct Tenths(i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}
