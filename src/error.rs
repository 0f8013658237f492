use std::io;

/// What the backward decoder found where it expected something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("expected a digit, found byte {0:#04x}")]
    ExpectedDigit(u8),

    #[error("expected '.', found byte {0:#04x}")]
    ExpectedDot(u8),

    #[error("expected ';', found byte {0:#04x}")]
    ExpectedSemicolon(u8),

    #[error("record has an empty station name")]
    EmptyStation,

    #[error("window ended in the middle of a record")]
    Truncated,
}

/// A malformed record, positioned relative to the decoded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {at}")]
pub struct DecodeError {
    pub at: usize,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) fn new(at: usize, kind: DecodeErrorKind) -> Self {
        Self { at, kind }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read {len} bytes at offset {offset}")]
    Io {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    #[error("malformed record near offset {offset}")]
    Format {
        offset: u64,
        #[source]
        source: DecodeError,
    },

    #[error("no newline within {probe} bytes before offset {boundary}")]
    NoNewlineInProbe { boundary: u64, probe: usize },

    #[error("record starting at offset {offset} does not fit in half of a {max} byte read")]
    RecordTooLong { offset: u64, max: usize },
}

impl ScanError {
    pub fn is_io(&self) -> bool {
        matches!(self, ScanError::Io { .. })
    }

    /// Every failure that is not an I/O failure is a violation of the record format.
    pub fn is_format(&self) -> bool {
        !self.is_io()
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
