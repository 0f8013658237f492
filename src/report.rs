use std::fmt;
use std::io::{self, Write};

use crate::table::{Stats, Table};

/// A tenths-of-a-degree integer printed with one decimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenths(pub i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}

/// Mean of a station in tenths, rounded half away from zero.
pub fn mean_tenths(stats: &Stats) -> i64 {
    let count = stats.count as i64;
    let half = count / 2;
    if stats.sum >= 0 {
        (stats.sum + half) / count
    } else {
        -((-stats.sum + half) / count)
    }
}

/// Writes `{name=min/mean/max, ...}` followed by a newline, ordered by station bytes.
pub fn write_report<W: Write>(table: &Table, out: &mut W) -> io::Result<()> {
    out.write_all(b"{")?;
    for (idx, (station, stats)) in table.sorted().into_iter().enumerate() {
        if idx > 0 {
            out.write_all(b", ")?;
        }
        write!(
            out,
            "{}={}/{}/{}",
            String::from_utf8_lossy(station),
            Tenths(stats.min.into()),
            Tenths(mean_tenths(stats)),
            Tenths(stats.max.into()),
        )?;
    }
    out.write_all(b"}\n")
}
