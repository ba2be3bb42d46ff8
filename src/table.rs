use crate::error::TableError;

/// Running statistics for one station, in tenths of a degree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationStat {
    key: Box<[u8]>,
    hash: u64,
    pub count: u64,
    pub sum: i64,
    pub min: i32,
    pub max: i32,
}

impl StationStat {
    pub(crate) fn new(key: &[u8], hash: u64) -> Self {
        Self {
            key: key.into(),
            hash,
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn observe(&mut self, value: i32) {
        self.count += 1;
        self.sum += value as i64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn absorb(&mut self, other: &StationStat) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Mean in tenths, rounded to nearest with ties toward positive infinity.
    pub fn mean_tenths(&self) -> i64 {
        let count = self.count.max(1) as i64;
        (2 * self.sum + count).div_euclid(2 * count)
    }

    #[inline]
    fn matches(&self, key: &[u8], hash: u64) -> bool {
        self.key.len() == key.len() && self.hash == hash && *self.key == *key
    }
}

/// Fixed-capacity open-addressing map from station name to statistics.
///
/// Slots are addressed by `hash & (capacity - 1)` with linear probing. The
/// table never grows; a key that finds neither a match nor an empty slot
/// after visiting every slot is reported as an overflow.
pub struct AggregateTable {
    slots: Vec<Option<StationStat>>,
    mask: usize,
    len: usize,
}

impl AggregateTable {
    /// `capacity` must be a non-zero power of two; `Config::validate` checks
    /// this before any table is built.
    pub fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            slots: vec![None; capacity],
            mask: capacity - 1,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot holding `key`, or the empty slot where it belongs.
    fn probe(&self, key: &[u8], hash: u64) -> Result<usize, TableError> {
        let mut i = hash as usize & self.mask;
        for _ in 0..self.slots.len() {
            match &self.slots[i] {
                None => return Ok(i),
                Some(stat) if stat.matches(key, hash) => return Ok(i),
                Some(_) => i = (i + 1) & self.mask,
            }
        }
        Err(TableError::Overflow {
            capacity: self.slots.len(),
        })
    }

    /// Entry for `key`, created empty on first sighting.
    pub(crate) fn find(&mut self, key: &[u8], hash: u64) -> Result<&mut StationStat, TableError> {
        let i = self.probe(key, hash)?;
        if self.slots[i].is_none() {
            self.len += 1;
        }
        Ok(self.slots[i].get_or_insert_with(|| StationStat::new(key, hash)))
    }

    #[inline]
    pub fn record(&mut self, key: &[u8], hash: u64, value: i32) -> Result<(), TableError> {
        self.find(key, hash)?.observe(value);
        Ok(())
    }

    pub fn get(&self, key: &[u8], hash: u64) -> Option<&StationStat> {
        let i = self.probe(key, hash).ok()?;
        self.slots[i].as_ref()
    }

    /// Fold every entry of `other` into this table.
    pub fn merge_from(&mut self, other: &AggregateTable) -> Result<(), TableError> {
        for stat in other.iter() {
            self.find(stat.key(), stat.hash())?.absorb(stat);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationStat> {
        self.slots.iter().flatten()
    }

    pub fn into_entries(self) -> Vec<StationStat> {
        self.slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::fnv1a;

    fn record(table: &mut AggregateTable, key: &str, value: i32) {
        table
            .record(key.as_bytes(), fnv1a(key.as_bytes()), value)
            .unwrap();
    }

    fn get<'a>(table: &'a AggregateTable, key: &str) -> &'a StationStat {
        table.get(key.as_bytes(), fnv1a(key.as_bytes())).unwrap()
    }

    #[test]
    fn test_find_creates_sentinel_entry() {
        let mut table = AggregateTable::with_capacity(16);
        let stat = table.find(b"Cardinal", fnv1a(b"Cardinal")).unwrap();
        assert_eq!(stat.count, 0);
        assert_eq!(stat.min, i32::MAX);
        assert_eq!(stat.max, i32::MIN);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_record_updates() {
        let mut table = AggregateTable::with_capacity(16);
        record(&mut table, "Cardinal", 300);
        record(&mut table, "Wolsey", 20);
        record(&mut table, "Cardinal", -15);

        let cardinal = get(&table, "Cardinal");
        assert_eq!(cardinal.count, 2);
        assert_eq!(cardinal.sum, 285);
        assert_eq!(cardinal.min, -15);
        assert_eq!(cardinal.max, 300);
        assert_eq!(get(&table, "Wolsey").sum, 20);
        assert_eq!(table.len(), 2);
        assert!(table.get(b"Ur", fnv1a(b"Ur")).is_none());
    }

    #[test]
    fn test_colliding_hashes_probe_linearly() {
        let mut table = AggregateTable::with_capacity(8);
        // Same hash, same length, different bytes.
        table.record(b"aa", 5, 10).unwrap();
        table.record(b"bb", 5, 20).unwrap();
        // Home slot 7 wraps around to slot 0.
        table.record(b"cc", 7, 30).unwrap();
        table.record(b"dd", 7, 40).unwrap();

        assert_eq!(table.get(b"aa", 5).unwrap().sum, 10);
        assert_eq!(table.get(b"bb", 5).unwrap().sum, 20);
        assert_eq!(table.get(b"cc", 7).unwrap().sum, 30);
        assert_eq!(table.get(b"dd", 7).unwrap().sum, 40);
        assert!(table.slots[0].is_some());
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_prefix_keys_are_distinct() {
        let mut table = AggregateTable::with_capacity(8);
        table.record(b"Bern", 1, 10).unwrap();
        table.record(b"Berne", 1, 20).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_overflow_is_detected() {
        let mut table = AggregateTable::with_capacity(4);
        for key in ["a", "b", "c", "d"] {
            record(&mut table, key, 1);
        }
        // Existing keys are still reachable in a full table.
        record(&mut table, "c", 2);
        assert_eq!(
            table.record(b"e", fnv1a(b"e"), 1),
            Err(TableError::Overflow { capacity: 4 })
        );
    }

    #[test]
    fn test_mean_rounding() {
        let mut stat = StationStat::new(b"x", 0);
        for v in [10, 11] {
            stat.observe(v);
        }
        // 10.5 tenths rounds up
        assert_eq!(stat.mean_tenths(), 11);

        let mut stat = StationStat::new(b"x", 0);
        for v in [-10, -11] {
            stat.observe(v);
        }
        // -10.5 tenths rounds toward positive infinity
        assert_eq!(stat.mean_tenths(), -10);

        let mut stat = StationStat::new(b"x", 0);
        for v in [-1, -1, 1] {
            stat.observe(v);
        }
        assert_eq!(stat.mean_tenths(), 0);
    }

    #[test]
    fn test_merge_from() {
        let mut a = AggregateTable::with_capacity(16);
        let mut b = AggregateTable::with_capacity(16);
        record(&mut a, "Oslo", 50);
        record(&mut b, "Oslo", -20);
        record(&mut b, "Perth", 250);

        a.merge_from(&b).unwrap();
        let oslo = get(&a, "Oslo");
        assert_eq!((oslo.count, oslo.sum, oslo.min, oslo.max), (2, 30, -20, 50));
        assert_eq!(get(&a, "Perth").count, 1);
        assert_eq!(a.len(), 2);
    }
}
