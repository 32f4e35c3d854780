use core::slice::from_mut as into_slice;
use std::io::{self, ErrorKind, Read, Write};

use super::arithmetic_coder::{ACRead, ACWrite};

/// Bit source over an `io::Read`, MSB first.
///
/// Once the inner reader runs dry it serves 0s forever and counts them, so a
/// decoder can tell a finished stream from one cut short.
pub struct ACReader<R> {
    inner: R,
    buf: u8,
    mask: u8,
    drained: bool,
    past_end: u64,
}

impl<R: Read> ACReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, buf: 0, mask: 0, drained: false, past_end: 0 }
    }

    fn next_byte(&mut self) -> io::Result<u8> {
        if self.drained {
            return Ok(0);
        }
        let mut byte = 0;
        match self.inner.read_exact(into_slice(&mut byte)) {
            Ok(()) => Ok(byte),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                self.drained = true;
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }
}

impl<R: Read> ACRead for ACReader<R> {
    fn read_bit(&mut self) -> io::Result<u8> {
        if self.mask == 0 {
            self.buf = self.next_byte()?;
            self.mask = 1 << 7;
        }
        let bit = self.buf & self.mask != 0;
        self.mask >>= 1;
        self.past_end += u64::from(self.drained);
        Ok(bit.into())
    }

    fn bits_past_end(&self) -> u64 {
        self.past_end
    }
}

/// Arithmetic coder write io for `io::Write` types
pub struct ACWriter<W> {
    inner: W,
    buf: u8,
    idx: u8,
}

impl<W: Write> ACWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, buf: 0, idx: 0 }
    }

    pub fn into_inner(self) -> W {
        debug_assert!(self.idx == 0, "dropping {} unflushed bits", self.idx);
        self.inner
    }
}

impl<W: Write> ACWrite for ACWriter<W> {
    fn write_bit(&mut self, bit: u8) -> io::Result<()> {
        debug_assert!(bit <= 1, "Tried to write invalid bit");

        self.buf = (self.buf << 1) | bit;
        self.idx = (self.idx + 1) % 8;
        if self.idx == 0 {
            self.inner.write_all(&[self.buf])?;
        }
        Ok(())
    }

    fn write_repeated(&mut self, bit: u8, mut n: u32) -> io::Result<()> {
        // top up the current byte, then emit whole bytes
        while n > 0 && self.idx != 0 {
            self.write_bit(bit)?;
            n -= 1;
        }
        let fill = if bit == 0 { 0x00 } else { 0xff };
        while n >= 8 {
            self.inner.write_all(&[fill])?;
            n -= 8;
        }
        for _ in 0..n {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        while self.idx > 0 {
            self.write_bit(0)?;
        }
        self.inner.flush()
    }
}

/// Counts the bits an encoder would emit, without storing them
#[derive(Debug, Default, Clone, Copy)]
pub struct BitCounter {
    bits: u64,
}

impl BitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Compressed size in bytes (rounded up)
    pub fn bytes(&self) -> u64 {
        self.bits.div_ceil(8)
    }
}

impl ACWrite for BitCounter {
    fn write_bit(&mut self, _bit: u8) -> io::Result<()> {
        self.bits += 1;
        Ok(())
    }

    fn write_repeated(&mut self, _bit: u8, n: u32) -> io::Result<()> {
        self.bits += u64::from(n);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.bits = self.bytes() * 8;
        Ok(())
    }
}
