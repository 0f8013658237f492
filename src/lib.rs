//! Parallel aggregation of `<station>;<temperature>` measurement files.
//!
//! The input is cut into newline-aligned byte ranges, each range is decoded
//! backwards into a private [`Table`] by its own worker, and the worker tables
//! are merged into one result identical to a sequential scan.

pub mod codec;
pub mod config;
pub mod error;
pub mod partition;
pub mod reader;
pub mod report;
pub mod scan;
pub mod table;

pub use codec::Record;
pub use config::ScanConfig;
pub use error::{DecodeError, DecodeErrorKind, ScanError};
pub use partition::{aggregate, partition, Aggregator, Partition};
pub use reader::{ReadBuffer, Source};
pub use scan::Scanner;
pub use table::{Stats, Table};
