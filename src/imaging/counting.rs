//! Byte-counting stream decorator.
//!
//! [`CountingReader`] exposes the same `Read`/`BufRead`/`Seek` contract as
//! the stream it wraps and records how far into the stream the consumer got.
//! The pipeline decodes through it to learn the encoded size of the original
//! without buffering the whole file first.
//!
//! The count is a high-water mark relative to where the wrapper started:
//! decoders that seek backwards (format sniffing, for example) re-read bytes
//! without inflating the total.

use std::io::{self, BufRead, Read, Seek, SeekFrom};

pub struct CountingReader<R> {
    inner: R,
    /// Current offset relative to the starting position.
    offset: u64,
    /// Furthest offset ever reached.
    consumed: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            consumed: 0,
        }
    }

    /// Number of distinct bytes consumed from the wrapped stream.
    pub fn bytes_read(&self) -> u64 {
        self.consumed
    }

    fn advance(&mut self, n: usize) {
        self.offset += n as u64;
        self.consumed = self.consumed.max(self.offset);
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.advance(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.advance(amt);
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let before = self.inner.stream_position()?;
        let after = self.inner.seek(pos)?;
        // Seeking moves the cursor but consumes nothing.
        self.offset = if after >= before {
            self.offset + (after - before)
        } else {
            self.offset.saturating_sub(before - after)
        };
        Ok(after)
    }
}
