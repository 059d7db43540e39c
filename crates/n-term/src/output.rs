// SPDX-License-Identifier: MIT
//
// Output buffering.
//
// `OutputBuffer` accumulates every escape byte of a frame in memory so the
// whole frame reaches the terminal in a single write() syscall. An optional
// hard capacity turns it into a bounded sink: `append` either takes all of
// its bytes or none of them, so a frame is never cut in half.

use std::io::{self, Write};

use crate::error::{Error, Result};

/// Default capacity: 16 KB, enough for most frames without reallocation.
const DEFAULT_CAPACITY: usize = 16_384;

/// A byte buffer that accumulates ANSI output for a single `write()`.
pub struct OutputBuffer {
    buf: Vec<u8>,
    limit: Option<usize>,
}

impl OutputBuffer {
    /// Create an unbounded buffer with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
            limit: None,
        }
    }

    /// Create a buffer that never grows past `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY.min(limit)),
            limit: Some(limit),
        }
    }

    /// The hard capacity, if any.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes that still fit, or `usize::MAX` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit.map_or(usize::MAX, |l| l.saturating_sub(self.buf.len()))
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append all of `bytes`, or nothing.
    ///
    /// # Errors
    ///
    /// [`Error::Limit`] when `bytes` would not fit under the hard capacity.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(Error::Limit("output buffer full"));
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Take the accumulated bytes, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Write accumulated output to stdout and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        self.flush_to(&mut io::stdout().lock())
    }

    /// Write accumulated output to an arbitrary writer and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        w.write_all(&self.buf)?;
        w.flush()?;
        self.buf.clear();
        Ok(())
    }
}

impl Write for OutputBuffer {
    /// All-or-nothing, like [`OutputBuffer::append`]. A full buffer reports
    /// `WriteZero` so `write!` surfaces it.
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)
            .map_err(|_| io::Error::new(io::ErrorKind::WriteZero, "output buffer full"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_stdout() / flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("len", &self.buf.len())
            .field("limit", &self.limit)
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
