//! Backward decoder for `<station>;<temperature>\n` records.
//!
//! A window is decoded from its last newline towards its start, so the
//! station name and its hash fall out of the same backward pass that finds the
//! previous record's newline. Temperatures are fixed point tenths; no float is
//! ever constructed.

use memchr::memrchr;

use crate::config::{FNV_OFFSET_BASIS, FNV_PRIME, MIN_RECORD_LEN};
use crate::error::{DecodeError, DecodeErrorKind};

/// One decoded measurement, borrowing the station name from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub station: &'a [u8],
    pub hash: u32,
    pub tenths: i16,
}

#[inline]
fn fold_hash(hash: u32, byte: u8) -> u32 {
    (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
}

/// Hash of a station name, identical to the one the decoder attaches to records.
pub fn station_hash(station: &[u8]) -> u32 {
    station
        .iter()
        .rev()
        .fold(FNV_OFFSET_BASIS, |hash, &byte| fold_hash(hash, byte))
}

/// Index of the last newline in `window`.
pub fn terminal_newline(window: &[u8]) -> Option<usize> {
    memrchr(b'\n', window)
}

/// Decodes every record before the last newline of `window` into `sink`.
///
/// Bytes after that newline are left alone. Returns the newline's index, or
/// `None` when the window holds no newline at all.
pub fn decode_window<'a, F>(window: &'a [u8], mut sink: F) -> Result<Option<usize>, DecodeError>
where
    F: FnMut(Record<'a>),
{
    let Some(newline) = terminal_newline(window) else {
        return Ok(None);
    };
    if newline < MIN_RECORD_LEN - 1 {
        return Ok(Some(newline));
    }
    for record in Records::new(&window[..newline]) {
        sink(record?);
    }
    Ok(Some(newline))
}

/// Integer part of a temperature: how many digits it has and whether it is negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Magnitude {
    One,
    NegativeOne,
    Two(u8),
    NegativeTwo(u8),
}

impl Magnitude {
    /// Reads whatever sits left of the ones digit, up to and including the `;`.
    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let (at, byte) = cursor.prev()?;
        match byte {
            b';' => Ok(Magnitude::One),
            b'-' => {
                cursor.expect(b';', DecodeErrorKind::ExpectedSemicolon)?;
                Ok(Magnitude::NegativeOne)
            }
            b'0'..=b'9' => {
                let tens = byte - b'0';
                let (at, byte) = cursor.prev()?;
                match byte {
                    b';' => Ok(Magnitude::Two(tens)),
                    b'-' => {
                        cursor.expect(b';', DecodeErrorKind::ExpectedSemicolon)?;
                        Ok(Magnitude::NegativeTwo(tens))
                    }
                    other => Err(DecodeError::new(at, DecodeErrorKind::ExpectedSemicolon(other))),
                }
            }
            other => Err(DecodeError::new(at, DecodeErrorKind::ExpectedSemicolon(other))),
        }
    }

    fn apply(self, low: i16) -> i16 {
        match self {
            Magnitude::One => low,
            Magnitude::NegativeOne => -low,
            Magnitude::Two(tens) => i16::from(tens) * 100 + low,
            Magnitude::NegativeTwo(tens) => -(i16::from(tens) * 100 + low),
        }
    }
}

/// Read position walking leftwards; `pos` is one past the next byte to read.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn prev(&mut self) -> Result<(usize, u8), DecodeError> {
        if self.pos == 0 {
            return Err(DecodeError::new(0, DecodeErrorKind::Truncated));
        }
        self.pos -= 1;
        Ok((self.pos, self.bytes[self.pos]))
    }

    fn digit(&mut self) -> Result<i16, DecodeError> {
        let (at, byte) = self.prev()?;
        let digit = byte.wrapping_sub(b'0');
        if digit > 9 {
            return Err(DecodeError::new(at, DecodeErrorKind::ExpectedDigit(byte)));
        }
        Ok(i16::from(digit))
    }

    fn expect(&mut self, want: u8, kind: fn(u8) -> DecodeErrorKind) -> Result<(), DecodeError> {
        let (at, byte) = self.prev()?;
        if byte != want {
            return Err(DecodeError::new(at, kind(byte)));
        }
        Ok(())
    }
}

/// Iterator over the records of `body`, last record first.
///
/// `body` is a window with its terminal newline cut off. Each step decodes the
/// record ending at the current position and moves to the newline preceding it.
pub struct Records<'a> {
    body: &'a [u8],
    end: Option<usize>,
}

impl<'a> Records<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        let end = (!body.is_empty()).then_some(body.len());
        Self { body, end }
    }

    fn decode_last(&mut self, end: usize) -> Result<Record<'a>, DecodeError> {
        let mut cursor = Cursor {
            bytes: self.body,
            pos: end,
        };
        let tenths = cursor.digit()?;
        cursor.expect(b'.', DecodeErrorKind::ExpectedDot)?;
        let ones = cursor.digit()?;
        let magnitude = Magnitude::read(&mut cursor)?;

        let semicolon = cursor.pos;
        let mut start = semicolon;
        let mut hash = FNV_OFFSET_BASIS;
        while start > 0 {
            let byte = self.body[start - 1];
            if byte == b'\n' {
                break;
            }
            hash = fold_hash(hash, byte);
            start -= 1;
        }
        if start == semicolon {
            return Err(DecodeError::new(semicolon, DecodeErrorKind::EmptyStation));
        }
        self.end = start.checked_sub(1);

        Ok(Record {
            station: &self.body[start..semicolon],
            hash,
            tenths: magnitude.apply(ones * 10 + tenths),
        })
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.end.take()?;
        Some(self.decode_last(end))
    }
}
