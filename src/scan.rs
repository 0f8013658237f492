use tracing::trace;

use crate::codec::decode_window;
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::reader::{ReadBuffer, Source};
use crate::table::Table;

/// Scans byte ranges of a source into a private table through a private buffer.
///
/// One scanner belongs to exactly one worker; nothing in it is shared.
pub struct Scanner<'s, S: Source + ?Sized> {
    source: &'s S,
    buffer: ReadBuffer,
    table: Table,
}

impl<'s, S: Source + ?Sized> Scanner<'s, S> {
    pub fn new(source: &'s S, config: &ScanConfig) -> Self {
        Self {
            source,
            buffer: ReadBuffer::new(config.max_read_len),
            table: Table::with_capacity(config.table_capacity),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Scans `[left, right)` and returns the offset of the last newline consumed.
    ///
    /// A range larger than one read is split in two. The right half resumes one
    /// byte past the last newline the left half consumed, so a record cut by the
    /// split is read again whole and no byte is counted twice. Bytes after the
    /// last newline of the whole range are not decoded.
    pub fn scan(&mut self, left: u64, right: u64) -> Result<Option<u64>> {
        let size = right.saturating_sub(left);
        let max = self.buffer.max_len() as u64;
        if size <= max {
            return self.scan_leaf(left, right);
        }

        let half = size / 2;
        let split = if half > max {
            left + half - half % max
        } else {
            left + half
        };
        trace!(left, split, right, "splitting range");

        let Some(newline) = self.scan(left, split)? else {
            return Err(ScanError::RecordTooLong {
                offset: left,
                max: self.buffer.max_len(),
            });
        };
        Ok(self.scan(newline + 1, right)?.or(Some(newline)))
    }

    fn scan_leaf(&mut self, left: u64, right: u64) -> Result<Option<u64>> {
        let len = right.saturating_sub(left) as usize;
        let window = self.buffer.fill(self.source, left, len)?;
        let table = &mut self.table;
        let newline = decode_window(window, |record| table.add(&record)).map_err(|source| {
            ScanError::Format {
                offset: left + source.at as u64,
                source,
            }
        })?;
        Ok(newline.map(|newline| left + newline as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;

    const STATIONS: [&str; 7] = ["Abha", "Oslo", "Zürich", "Lagos", "Ulaanbaatar", "St. John's", "Hamburg"];

    fn sample(lines: usize) -> Vec<u8> {
        let mut data = String::new();
        for i in 0..lines {
            let tenths = (i as i32 * 37) % 1999 - 999;
            let sign = if tenths < 0 { "-" } else { "" };
            let abs = tenths.unsigned_abs();
            data.push_str(&format!("{};{sign}{}.{}\n", STATIONS[i % STATIONS.len()], abs / 10, abs % 10));
        }
        data.into_bytes()
    }

    fn scan_all(data: &Vec<u8>, max_read_len: usize) -> Result<(Table, Option<u64>)> {
        let config = ScanConfig::default().with_max_read_len(max_read_len);
        let mut scanner = Scanner::new(data, &config);
        let newline = scanner.scan(0, data.len() as u64)?;
        Ok((scanner.into_table(), newline))
    }

    #[test]
    fn single_leaf_consumes_every_record() {
        let data = b"A;0.0\nB;-5.2\nA;3.1\n".to_vec();
        let (table, newline) = scan_all(&data, 1024).unwrap();
        assert_eq!(newline, Some(18));
        let a = table.get(b"A").unwrap();
        assert_eq!((a.count, a.sum, a.min, a.max), (2, 31, 0, 31));
        let b = table.get(b"B").unwrap();
        assert_eq!((b.count, b.sum, b.min, b.max), (1, -52, -52, -52));
    }

    #[test]
    fn oversized_range_matches_unbounded_scan() {
        let data = sample(2_000);
        let (unbounded, last) = scan_all(&data, data.len()).unwrap();
        for max_read_len in [40, 41, 64, 100, 1024, 4096] {
            let (split, newline) = scan_all(&data, max_read_len).unwrap();
            assert_eq!(split, unbounded, "max_read_len {max_read_len}");
            assert_eq!(newline, last);
        }
        let total: u64 = unbounded.iter().map(|(_, stats)| stats.count).sum();
        assert_eq!(total, 2_000);
    }

    #[test]
    fn unterminated_tail_is_not_decoded() {
        let data = b"A;1.0\nB;2.".to_vec();
        let (table, newline) = scan_all(&data, 1024).unwrap();
        assert_eq!(newline, Some(5));
        assert_eq!(table.len(), 1);
        assert!(table.get(b"B").is_none());

        let (table, newline) = scan_all(&b"B;2.".to_vec(), 1024).unwrap();
        assert_eq!(newline, None);
        assert!(table.is_empty());
    }

    #[test]
    fn format_error_reports_absolute_offset() {
        let data = b"A;1.0\nB;2.0\nC;x.0\n".to_vec();
        for max_read_len in [8, 1024] {
            match scan_all(&data, max_read_len) {
                Err(ScanError::Format { offset, source }) => {
                    assert_eq!(offset, 14);
                    assert_eq!(source.kind, DecodeErrorKind::ExpectedDigit(b'x'));
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn record_longer_than_half_a_read_is_rejected() {
        let data = b"Llanfairpwllgwyngyll;1.0\n".to_vec();
        match scan_all(&data, 8) {
            Err(ScanError::RecordTooLong { offset, max }) => assert_eq!((offset, max), (0, 8)),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
