use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use tracing_subscriber::EnvFilter;

use brc_report::config::MAX_READ_LEN;
use brc_report::report::write_report;
use brc_report::{Aggregator, ScanConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Per-station min/mean/max of a measurements file")]
struct Args {
    /// File of `<station>;<temperature>` lines.
    path: PathBuf,

    /// Number of byte ranges scanned in parallel. Defaults to the number of CPUs.
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Largest single read, in bytes.
    #[arg(long, default_value_t = MAX_READ_LEN as u64, value_parser = clap::value_parser!(u64).range(64..))]
    max_read: u64,

    /// Read through a memory map instead of positioned file reads.
    #[arg(long)]
    mmap: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let workers = args
        .workers
        .unwrap_or_else(|| NonZeroUsize::new(rayon::current_num_threads()).unwrap_or(NonZeroUsize::MIN));
    let max_read_len = usize::try_from(args.max_read).context("--max-read is too large for this platform")?;
    let aggregator = Aggregator::new(ScanConfig::default().with_max_read_len(max_read_len));

    let path = args.path.display();
    let file = File::open(&args.path).with_context(|| format!("failed to open {path}"))?;
    let table = if args.mmap {
        // The file is only read, and is expected not to change while mapped.
        let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("failed to map {path}"))?;
        aggregator.run(&mmap, mmap.len() as u64, workers)
    } else {
        let size = file
            .metadata()
            .with_context(|| format!("failed to stat {path}"))?
            .len();
        aggregator.run(&file, size, workers)
    }
    .with_context(|| format!("failed to aggregate {path}"))?;

    let mut out = BufWriter::new(io::stdout().lock());
    write_report(&table, &mut out)?;
    out.flush()?;
    Ok(())
}
