use crate::error::TableError;
use crate::table::AggregateTable;

/// Fold every table into the first one.
///
/// Only call this once all workers have finished. The combination is
/// commutative, so the order of `tables` does not affect the result.
pub fn merge<I>(tables: I) -> Result<Option<AggregateTable>, TableError>
where
    I: IntoIterator<Item = AggregateTable>,
{
    let mut tables = tables.into_iter();
    let Some(mut acc) = tables.next() else {
        return Ok(None);
    };
    for table in tables {
        acc.merge_from(&table)?;
    }
    Ok(Some(acc))
}
