use std::io;

pub const CODE_VALUE_BITS: u32 = 16;
pub const TOP_VALUE: u32 = (1 << CODE_VALUE_BITS) - 1; // 0xFFFF
pub const FIRST_QTR: u32 = TOP_VALUE / 4 + 1; // 0x4000, point after first quarter
pub const HALF: u32 = 2 * FIRST_QTR; // 0x8000
pub const THIRD_QTR: u32 = 3 * FIRST_QTR; // 0xC000

/// Largest `total` the coder accepts. After renormalization the range is always
/// wider than a quarter, so every slice of at least 1 stays non-empty.
pub const MAX_FREQUENCY: u32 = (1 << (CODE_VALUE_BITS - 2)) - 1; // 16383

/// The `ArithmeticCoder` narrows `[low, high]` to cumulative frequency intervals.
///
/// The same type is an encoder when `T: ACWrite` and a decoder when `T: ACRead`.
/// Both halves run the exact same integer arithmetic, bit for bit.
#[derive(Clone)]
pub struct ArithmeticCoder<T> {
    low: u32,
    high: u32,
    value: u32,   // decoder only: bits consumed so far
    pending: u32, // encoder only: opposite bits to follow (E3)
    io: T,
}

pub trait ACRead {
    /// Read bit or 0 on EOF
    fn read_bit(&mut self) -> io::Result<u8>;

    /// 0 bits served after the end of the stream
    fn bits_past_end(&self) -> u64;
}

pub trait ACWrite {
    /// Writes a single bit
    fn write_bit(&mut self, bit: u8) -> io::Result<()>;

    /// Writes `n` copies of `bit`, `n` may be 0
    fn write_repeated(&mut self, bit: u8, n: u32) -> io::Result<()> {
        for _ in 0..n {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    /// Pads to a byte boundary with 0s and flushes the internal writer
    fn flush(&mut self) -> io::Result<()>;
}

impl<T> ArithmeticCoder<T> {
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    // Shared by encode and pop_symbol
    #[inline(always)]
    fn narrow(&mut self, low: u32, high: u32, total: u32) {
        debug_assert!(low < high && high <= total, "empty interval [{low}, {high}) of {total}");
        debug_assert!(total <= MAX_FREQUENCY, "total {total} overflows the coder");

        let range = self.high - self.low + 1;
        self.high = self.low + (range * high) / total - 1;
        self.low += (range * low) / total;
    }
}

impl<W: ACWrite> ArithmeticCoder<W> {
    pub fn new_coder(writer: W) -> Self {
        Self { low: 0, high: TOP_VALUE, value: 0, pending: 0, io: writer }
    }

    /// Encodes the slice `[low, high)` of the cumulative frequency space `[0, total)`
    pub fn encode(&mut self, low: u32, high: u32, total: u32) -> io::Result<()> {
        self.narrow(low, high, total);

        loop {
            if self.high < HALF {
                self.bit_plus_follow(0)?;
            } else if self.low >= HALF {
                self.bit_plus_follow(1)?;
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
                // E3 renorm (middle half straddle) -> defer an opposite bit
                self.pending += 1;
                self.low -= FIRST_QTR;
                self.high -= FIRST_QTR;
            } else {
                break;
            }

            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }

        Ok(())
    }

    /// Writes the two bits that select the quarter holding the final range,
    /// then pads the stream to a byte boundary
    pub fn flush(&mut self) -> io::Result<()> {
        debug_assert!(self.low < HALF && self.high >= HALF, "range is not normalized");

        self.pending += 1;
        if self.low < FIRST_QTR {
            self.bit_plus_follow(0)?;
        } else {
            self.bit_plus_follow(1)?;
        }
        self.io.flush()
    }

    fn bit_plus_follow(&mut self, bit: u8) -> io::Result<()> {
        self.io.write_bit(bit)?;
        self.io.write_repeated(bit ^ 1, self.pending)?;
        self.pending = 0;
        Ok(())
    }
}

impl<R: ACRead> ArithmeticCoder<R> {
    pub fn new_decoder(mut reader: R) -> io::Result<Self> {
        let mut value = 0;
        for _ in 0..CODE_VALUE_BITS {
            value = (value << 1) | u32::from(reader.read_bit()?);
        }
        Ok(Self { low: 0, high: TOP_VALUE, value, pending: 0, io: reader })
    }

    /// Cumulative frequency in `[0, total)` that the next symbol's slice contains
    pub fn cum_freq(&self, total: u32) -> u32 {
        let range = self.high - self.low + 1;
        let cum = ((self.value - self.low + 1) * total - 1) / range;
        debug_assert!(cum < total);
        cum
    }

    /// Removes the slice `[low, high)` of `[0, total)` and fetches new bits
    pub fn pop_symbol(&mut self, low: u32, high: u32, total: u32) -> io::Result<()> {
        self.narrow(low, high, total);

        loop {
            if self.high < HALF {
                // nothing to remove
            } else if self.low >= HALF {
                self.value -= HALF;
                self.low -= HALF;
                self.high -= HALF;
            } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
                self.value -= FIRST_QTR;
                self.low -= FIRST_QTR;
                self.high -= FIRST_QTR;
            } else {
                break;
            }

            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = (self.value << 1) | u32::from(self.io.read_bit()?);
        }

        debug_assert!(self.low <= self.value && self.value <= self.high);
        Ok(())
    }
}
