use std::fs::File;
use std::io;

use memmap2::Mmap;

use crate::error::{Result, ScanError};

/// Random access byte source shared by every worker of a run.
///
/// Reads are positioned, so implementations must not rely on a shared cursor.
pub trait Source: Sync {
    /// Fills `buf` completely from `offset`, failing with `UnexpectedEof` on a short source.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()>;
}

impl Source for File {
    #[cfg(unix)]
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        std::os::unix::fs::FileExt::read_exact_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        while !buf.is_empty() {
            match self.seek_read(buf, offset) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => {
                    buf = &mut buf[n..];
                    offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Source for [u8] {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let start = usize::try_from(offset).map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.get(start..end))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

impl Source for Vec<u8> {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.as_slice().read_exact_at(buf, offset)
    }
}

impl Source for Mmap {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self[..].read_exact_at(buf, offset)
    }
}

impl<S: Source + ?Sized> Source for &S {
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        (**self).read_exact_at(buf, offset)
    }
}

/// Reusable read buffer owned by a single worker, capped at `max_len` bytes per read.
#[derive(Debug)]
pub struct ReadBuffer {
    bytes: Vec<u8>,
    max_len: usize,
}

impl ReadBuffer {
    pub fn new(max_len: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_len),
            max_len,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Reads exactly `[offset, offset + len)` and returns the filled bytes.
    ///
    /// Callers keep `len` within [`max_len`](Self::max_len).
    pub fn fill<S: Source + ?Sized>(&mut self, source: &S, offset: u64, len: usize) -> Result<&[u8]> {
        debug_assert!(
            len <= self.max_len,
            "read of {len} bytes exceeds the {} byte cap",
            self.max_len
        );
        self.bytes.resize(len, 0);
        source
            .read_exact_at(&mut self.bytes, offset)
            .map_err(|source| ScanError::Io { offset, len, source })?;
        Ok(&self.bytes)
    }
}
