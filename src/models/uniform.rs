use std::io;

use super::{Symbol, NO_OF_SYMBOLS};
use crate::entropy_coding::{ACRead, ACWrite, ArithmeticCoder};
use crate::u16;

/// Equal odds for every byte and EOF, used once every context escaped
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformModel;

const TOTAL: u32 = NO_OF_SYMBOLS as u32;

impl UniformModel {
    pub fn encode<W: ACWrite>(&self, symbol: Symbol, coder: &mut ArithmeticCoder<W>) -> io::Result<()> {
        let low = u32::from(symbol);
        debug_assert!(low < TOTAL, "symbol {symbol} can't be coded");
        coder.encode(low, low + 1, TOTAL)
    }

    pub fn decode<R: ACRead>(&self, coder: &mut ArithmeticCoder<R>) -> io::Result<Symbol> {
        let cum = coder.cum_freq(TOTAL);
        coder.pop_symbol(cum, cum + 1, TOTAL)?;
        Ok(u16!(cum))
    }
}
