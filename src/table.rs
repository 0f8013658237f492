use std::mem;

use crate::codec::{station_hash, Record};
use crate::config::TABLE_CAPACITY;

/// Running statistics of one station, in tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub count: u64,
    pub sum: i64,
    pub min: i16,
    pub max: i16,
}

impl Stats {
    fn new(tenths: i16) -> Self {
        Self {
            count: 1,
            sum: i64::from(tenths),
            min: tenths,
            max: tenths,
        }
    }

    fn record(&mut self, tenths: i16) {
        self.count += 1;
        self.sum += i64::from(tenths);
        self.min = self.min.min(tenths);
        self.max = self.max.max(tenths);
    }

    pub fn merge(&mut self, other: &Stats) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

#[derive(Debug, Clone)]
struct Entry {
    hash: u32,
    station: Box<[u8]>,
    stats: Stats,
}

/// Open addressing map from station bytes to [`Stats`].
///
/// The record hash picks the home slot; identity is decided by comparing the
/// name bytes, so two stations whose hashes collide keep separate entries.
/// Collisions are resolved by linear probing and the slot array doubles once
/// it is half full.
#[derive(Debug, Clone)]
pub struct Table {
    slots: Vec<Option<Entry>>,
    len: usize,
}

impl Default for Table {
    fn default() -> Self {
        Self::with_capacity(TABLE_CAPACITY)
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the entry for `station`, or of the empty slot where it belongs.
    fn slot_for(&self, hash: u32, station: &[u8]) -> usize {
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match &self.slots[idx] {
                Some(entry) if entry.hash != hash || *entry.station != *station => {
                    idx = (idx + 1) & mask;
                }
                _ => return idx,
            }
        }
    }

    fn occupy(&mut self, idx: usize, entry: Entry) {
        self.slots[idx] = Some(entry);
        self.len += 1;
        if self.len * 2 > self.slots.len() {
            self.grow();
        }
    }

    fn grow(&mut self) {
        let doubled = (0..self.slots.len() * 2).map(|_| None).collect();
        let old = mem::replace(&mut self.slots, doubled);
        for entry in old.into_iter().flatten() {
            let idx = self.slot_for(entry.hash, &entry.station);
            self.slots[idx] = Some(entry);
        }
    }

    /// Folds one reading into its station's entry, copying the name on first sight.
    pub fn add(&mut self, record: &Record<'_>) {
        let idx = self.slot_for(record.hash, record.station);
        if let Some(entry) = &mut self.slots[idx] {
            entry.stats.record(record.tenths);
            return;
        }
        self.occupy(
            idx,
            Entry {
                hash: record.hash,
                station: record.station.into(),
                stats: Stats::new(record.tenths),
            },
        );
    }

    /// Absorbs every entry of `other`. Entries move across without re-copying names.
    pub fn merge(&mut self, other: Table) {
        for entry in other.slots.into_iter().flatten() {
            let idx = self.slot_for(entry.hash, &entry.station);
            if let Some(existing) = &mut self.slots[idx] {
                existing.stats.merge(&entry.stats);
                continue;
            }
            self.occupy(idx, entry);
        }
    }

    pub fn get(&self, station: &[u8]) -> Option<&Stats> {
        let idx = self.slot_for(station_hash(station), station);
        self.slots[idx].as_ref().map(|entry| &entry.stats)
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Stats)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|entry| (&*entry.station, &entry.stats))
    }

    /// Entries ordered by raw station bytes.
    pub fn sorted(&self) -> Vec<(&[u8], &Stats)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len
            && self.slots.iter().flatten().all(|entry| {
                let idx = other.slot_for(entry.hash, &entry.station);
                matches!(&other.slots[idx], Some(theirs) if theirs.stats == entry.stats)
            })
    }
}

impl Eq for Table {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(station: &[u8], tenths: i16) -> Record<'_> {
        Record {
            station,
            hash: station_hash(station),
            tenths,
        }
    }

    fn table_of(readings: &[(&[u8], i16)]) -> Table {
        let mut table = Table::with_capacity(4);
        for &(station, tenths) in readings {
            table.add(&record(station, tenths));
        }
        table
    }

    #[test]
    fn add_accumulates_per_station() {
        let table = table_of(&[(b"A", 0), (b"B", -52), (b"A", 31)]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(b"A"),
            Some(&Stats { count: 2, sum: 31, min: 0, max: 31 })
        );
        assert_eq!(
            table.get(b"B"),
            Some(&Stats { count: 1, sum: -52, min: -52, max: -52 })
        );
        assert_eq!(table.get(b"C"), None);
    }

    #[test]
    fn colliding_names_stay_separate() {
        let mut table = Table::with_capacity(8);
        for (station, tenths) in [(&b"Kyiv"[..], 10), (&b"Lima"[..], 200), (&b"Kyiv"[..], -30)] {
            table.add(&Record { station, hash: 0xdead_beef, tenths });
        }
        assert_eq!(table.len(), 2);

        let mut other = Table::with_capacity(2);
        other.add(&Record { station: b"Lima", hash: 0xdead_beef, tenths: -5 });
        table.merge(other);

        let entries = table.sorted();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, b"Kyiv");
        assert_eq!(*entries[0].1, Stats { count: 2, sum: -20, min: -30, max: 10 });
        assert_eq!(entries[1].0, b"Lima");
        assert_eq!(*entries[1].1, Stats { count: 2, sum: 195, min: -5, max: 200 });
    }

    #[test]
    fn grows_past_initial_capacity() {
        let names: Vec<String> = (0..1000).map(|i| format!("station-{i}")).collect();
        let mut table = Table::with_capacity(2);
        for (i, name) in names.iter().enumerate() {
            table.add(&record(name.as_bytes(), (i % 100) as i16));
        }
        assert_eq!(table.len(), 1000);
        for (i, name) in names.iter().enumerate() {
            let stats = table.get(name.as_bytes()).unwrap();
            assert_eq!(stats.count, 1);
            assert_eq!(stats.sum, (i % 100) as i64);
        }
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let a: &[(&[u8], i16)] = &[(b"A", 10), (b"B", -3), (b"A", 7)];
        let b: &[(&[u8], i16)] = &[(b"B", 99), (b"C", 0)];
        let c: &[(&[u8], i16)] = &[(b"A", -999), (b"C", 12), (b"D", 5)];

        let mut ab = table_of(a);
        ab.merge(table_of(b));
        let mut ba = table_of(b);
        ba.merge(table_of(a));
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        ab_c.merge(table_of(c));
        let mut bc = table_of(b);
        bc.merge(table_of(c));
        let mut a_bc = table_of(a);
        a_bc.merge(bc);
        assert_eq!(ab_c, a_bc);

        let all: Vec<(&[u8], i16)> = a.iter().chain(b).chain(c).copied().collect();
        assert_eq!(ab_c, table_of(&all));
    }

    #[test]
    fn sorted_orders_by_raw_bytes() {
        let table = table_of(&[(b"b", 1), ("Ä".as_bytes(), 2), (b"a", 3), (b"B", 4)]);
        let names: Vec<&[u8]> = table.sorted().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec![&b"B"[..], &b"a"[..], &b"b"[..], "Ä".as_bytes()]);
    }

    #[test]
    fn unequal_tables_compare_unequal() {
        assert_ne!(table_of(&[(b"A", 1)]), table_of(&[(b"A", 2)]));
        assert_ne!(table_of(&[(b"A", 1)]), table_of(&[(b"B", 1)]));
        assert_eq!(Table::new(), Table::with_capacity(2));
    }
}
