use std::num::NonZeroUsize;
use std::ops::Range;
use std::thread;
use std::time::Instant;

use memchr::memrchr;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::reader::{ReadBuffer, Source};
use crate::scan::Scanner;
use crate::table::Table;

/// Byte ranges of one run: one per spawned worker plus the tail the caller scans itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub workers: Vec<Range<u64>>,
    pub tail: Range<u64>,
}

/// Cuts `[0, size)` into `workers` contiguous ranges whose inner edges sit just past a newline.
///
/// Every range but the last gets `size / workers` bytes minus its clip. The
/// last range is the tail and absorbs the remainder of the division as well
/// as all clipped bytes.
pub fn partition<S: Source + ?Sized>(
    source: &S,
    size: u64,
    workers: NonZeroUsize,
    probe_len: usize,
) -> Result<Partition> {
    let chunk = size / workers.get() as u64;
    let mut probe = ReadBuffer::new(probe_len);
    let mut ranges = Vec::with_capacity(workers.get() - 1);
    let mut offset = 0;
    for _ in 1..workers.get() {
        let candidate = offset + chunk;
        let end = candidate - clip(source, &mut probe, offset, candidate)?;
        ranges.push(offset..end);
        offset = end;
    }
    Ok(Partition {
        workers: ranges,
        tail: offset..size,
    })
}

/// Bytes between the last newline before `boundary` and `boundary` itself.
///
/// The probe never looks left of `start`. A probe shortened by `start` that
/// finds no newline clips the whole range away.
fn clip<S: Source + ?Sized>(source: &S, probe: &mut ReadBuffer, start: u64, boundary: u64) -> Result<u64> {
    let len = (boundary - start).min(probe.max_len() as u64) as usize;
    let window = probe.fill(source, boundary - len as u64, len)?;
    match memrchr(b'\n', window) {
        Some(idx) => Ok((len - idx - 1) as u64),
        None if len < probe.max_len() => Ok(len as u64),
        None => Err(ScanError::NoNewlineInProbe {
            boundary,
            probe: probe.max_len(),
        }),
    }
}

/// Runs a partitioned scan and merges the per-worker tables.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: ScanConfig,
}

impl Aggregator {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Aggregates the first `size` bytes of `source` using `workers` ranges.
    ///
    /// `workers - 1` ranges go to scoped threads, the tail is scanned on the
    /// calling thread. Worker tables are merged in range order once every
    /// worker has finished. The first error any range reports fails the run.
    pub fn run<S: Source + ?Sized>(&self, source: &S, size: u64, workers: NonZeroUsize) -> Result<Table> {
        let started = Instant::now();
        let plan = partition(source, size, workers, self.config.probe_len)?;
        debug!(workers = ?plan.workers, tail = ?plan.tail, "partitioned input");

        let spawned = plan.workers.len();
        let (tx, rx) = crossbeam_channel::bounded(spawned.max(1));
        let table = thread::scope(|scope| -> Result<Table> {
            for (worker, range) in plan.workers.iter().cloned().enumerate() {
                let tx = tx.clone();
                let config = &self.config;
                scope.spawn(move || {
                    let result = scan_worker(source, config, worker, range);
                    // Cannot fail: the receiver outlives the scope.
                    let _ = tx.send((worker, result));
                });
            }
            drop(tx);

            let mut table = self.scan_tail(source, plan.tail.clone())?;

            let mut finished: Vec<Option<Table>> = (0..spawned).map(|_| None).collect();
            for (worker, result) in rx.iter() {
                finished[worker] = Some(result?);
            }
            for worker_table in finished.into_iter().flatten() {
                table.merge(worker_table);
            }
            Ok(table)
        })?;

        info!(
            bytes = size,
            workers = workers.get(),
            stations = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregated input"
        );
        Ok(table)
    }

    fn scan_tail<S: Source + ?Sized>(&self, source: &S, range: Range<u64>) -> Result<Table> {
        let mut scanner = Scanner::new(source, &self.config);
        let last = scanner.scan(range.start, range.end)?;
        let consumed = last.map_or(range.start, |newline| newline + 1);
        if consumed < range.end {
            warn!(
                offset = consumed,
                discarded = range.end - consumed,
                "discarding final record without a trailing newline"
            );
        }
        Ok(scanner.into_table())
    }
}

fn scan_worker<S: Source + ?Sized>(
    source: &S,
    config: &ScanConfig,
    worker: usize,
    range: Range<u64>,
) -> Result<Table> {
    let mut scanner = Scanner::new(source, config);
    scanner.scan(range.start, range.end)?;
    debug!(
        worker,
        start = range.start,
        end = range.end,
        stations = scanner.table().len(),
        "worker finished"
    );
    Ok(scanner.into_table())
}

/// [`Aggregator::run`] with the default configuration.
pub fn aggregate<S: Source + ?Sized>(source: &S, size: u64, workers: NonZeroUsize) -> Result<Table> {
    Aggregator::default().run(source, size, workers)
}
