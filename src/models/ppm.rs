use std::{io, marker::PhantomData};

use super::{
    context_buffer::ContextBuffer, trie::ContextTrie, uniform::UniformModel, Symbol, EOF_SYMBOL,
};
use crate::config::PpmConfig;
use crate::entropy_coding::{arithmetic_coder::CODE_VALUE_BITS, ACRead, ACWrite, ArithmeticCoder};
use crate::error::{Error, Result};
use crate::u8;

/// Order-N PPM model: one trie per order 1..=K, the recent-symbol window, and
/// the uniform fallback that plays order 0.
///
/// Encoder and decoder each need their own model, started from the same state.
#[derive(Debug, Clone)]
pub struct PpmModel {
    pub(super) config: PpmConfig,
    pub(super) tries: Vec<ContextTrie>, // tries[k - 1] is order k
    pub(super) buffer: ContextBuffer,
    fallback: UniformModel,
}

impl PpmModel {
    pub fn new(config: PpmConfig) -> Result<Self> {
        config.validate()?;
        let tries = (0..config.max_order).map(|_| ContextTrie::new(config.block_nodes)).collect();
        Ok(Self::from_parts(config, tries, ContextBuffer::new(config.max_order)))
    }

    pub(super) fn from_parts(config: PpmConfig, tries: Vec<ContextTrie>, buffer: ContextBuffer) -> Self {
        debug_assert_eq!(tries.len(), config.max_order);
        Self { config, tries, buffer, fallback: UniformModel }
    }

    pub fn config(&self) -> &PpmConfig {
        &self.config
    }

    pub fn max_order(&self) -> usize {
        self.config.max_order
    }

    pub fn context(&self) -> &ContextBuffer {
        &self.buffer
    }

    /// Trie of the given order, 1..=K
    pub fn trie(&self, order: usize) -> Option<&ContextTrie> {
        order.checked_sub(1).and_then(|i| self.tries.get(i))
    }

    pub fn node_count(&self) -> usize {
        self.tries.iter().map(ContextTrie::node_count).sum()
    }

    /// Starts over from an empty context, keeping the statistics
    pub fn reset_context(&mut self) {
        self.buffer.clear();
        self.forget_paths();
    }

    // Longest context first, the first order that predicts the symbol codes it
    fn encode_symbol<W: ACWrite>(&mut self, symbol: Symbol, coder: &mut ArithmeticCoder<W>) -> io::Result<()> {
        self.forget_paths();
        let n = self.buffer.len();
        for order in (1..=n).rev() {
            if self.tries[order - 1].encode(&self.buffer, n - order, symbol, coder)? {
                return Ok(());
            }
        }
        self.fallback.encode(symbol, coder)
    }

    fn decode_symbol<R: ACRead>(&mut self, coder: &mut ArithmeticCoder<R>) -> io::Result<Symbol> {
        self.forget_paths();
        let n = self.buffer.len();
        for order in (1..=n).rev() {
            if let Some(symbol) = self.tries[order - 1].decode(&self.buffer, n - order, coder)? {
                return Ok(symbol);
            }
        }
        self.fallback.decode(coder)
    }

    // Every available order learns, not only the ones that escaped
    fn learn(&mut self, symbol: Symbol) -> Result<()> {
        let n = self.buffer.len();
        for order in 1..=n {
            self.tries[order - 1].update(&self.buffer, n - order, symbol)?;
        }
        Ok(())
    }

    fn advance(&mut self, symbol: Symbol) {
        if symbol != EOF_SYMBOL {
            self.buffer.push(u8!(symbol));
        }
    }

    fn forget_paths(&mut self) {
        self.tries.iter_mut().for_each(ContextTrie::forget_path);
    }
}

/// What happens to the statistics after each coded symbol
pub trait UpdatePolicy {
    fn learn(model: &mut PpmModel, symbol: Symbol) -> Result<()>;
}

/// Trains every order on every symbol
pub struct Adaptive;

/// Codes with the statistics as they are (e.g. a pre-trained model)
pub struct Frozen;

impl UpdatePolicy for Adaptive {
    #[inline(always)]
    fn learn(model: &mut PpmModel, symbol: Symbol) -> Result<()> {
        model.learn(symbol)
    }
}

impl UpdatePolicy for Frozen {
    #[inline(always)]
    fn learn(_model: &mut PpmModel, _symbol: Symbol) -> Result<()> {
        Ok(())
    }
}

pub struct PpmEncoder<'m, W, U = Adaptive> {
    model: &'m mut PpmModel,
    coder: ArithmeticCoder<W>,
    eof: bool,
    _policy: PhantomData<U>,
}

impl<'m, W: ACWrite> PpmEncoder<'m, W> {
    pub fn new(model: &'m mut PpmModel, writer: W) -> Self {
        Self::with_policy(model, writer)
    }
}

impl<'m, W: ACWrite, U: UpdatePolicy> PpmEncoder<'m, W, U> {
    pub fn with_policy(model: &'m mut PpmModel, writer: W) -> Self {
        Self { model, coder: ArithmeticCoder::new_coder(writer), eof: false, _policy: PhantomData }
    }

    pub fn encode(&mut self, byte: u8) -> Result<()> {
        self.encode_symbol(byte.into())
    }

    pub fn encode_all(&mut self, bytes: &[u8]) -> Result<()> {
        bytes.iter().try_for_each(|&byte| self.encode(byte))
    }

    /// Codes one symbol, then trains and slides the context
    pub fn encode_symbol(&mut self, symbol: Symbol) -> Result<()> {
        debug_assert!(!self.eof, "symbol {symbol} after EOF");
        debug_assert!(symbol <= EOF_SYMBOL);

        self.model.encode_symbol(symbol, &mut self.coder)?;
        U::learn(self.model, symbol)?;
        self.model.advance(symbol);
        self.eof |= symbol == EOF_SYMBOL;
        Ok(())
    }

    /// Terminates the stream with EOF (once) and flushes the coder
    pub fn finish(mut self) -> Result<W> {
        if !self.eof {
            self.encode_symbol(EOF_SYMBOL)?;
        }
        self.coder.flush()?;
        Ok(self.coder.into_inner())
    }
}

/// Decodes until EOF. A stream that needs more than `CODE_VALUE_BITS` bits
/// past its end before reaching EOF fails with `Error::CorruptStream`, and a
/// failed decoder stays failed.
pub struct PpmDecoder<'m, R, U = Adaptive> {
    model: &'m mut PpmModel,
    coder: ArithmeticCoder<R>,
    eof: bool,
    failed: bool,
    _policy: PhantomData<U>,
}

impl<'m, R: ACRead> PpmDecoder<'m, R> {
    pub fn new(model: &'m mut PpmModel, reader: R) -> Result<Self> {
        Self::with_policy(model, reader)
    }
}

impl<'m, R: ACRead, U: UpdatePolicy> PpmDecoder<'m, R, U> {
    pub fn with_policy(model: &'m mut PpmModel, reader: R) -> Result<Self> {
        let coder = ArithmeticCoder::new_decoder(reader)?;
        Ok(Self { model, coder, eof: false, failed: false, _policy: PhantomData })
    }

    /// Next symbol, `EOF_SYMBOL` ends the stream (and keeps being returned)
    pub fn decode_symbol(&mut self) -> Result<Symbol> {
        if self.eof {
            return Ok(EOF_SYMBOL);
        }
        if self.failed {
            return Err(Error::CorruptStream);
        }

        let result = self.next_symbol();
        self.failed = result.is_err();
        result
    }

    pub fn decode(&mut self) -> Result<Option<u8>> {
        let symbol = self.decode_symbol()?;
        Ok((symbol != EOF_SYMBOL).then(|| u8!(symbol)))
    }

    pub fn is_finished(&self) -> bool {
        self.eof
    }

    fn next_symbol(&mut self) -> Result<Symbol> {
        let symbol = self.model.decode_symbol(&mut self.coder)?;
        // a complete stream is never read more than this far past its end
        if self.coder.get_ref().bits_past_end() > u64::from(CODE_VALUE_BITS) {
            return Err(Error::CorruptStream);
        }

        U::learn(self.model, symbol)?;
        self.model.advance(symbol);
        self.eof = symbol == EOF_SYMBOL;
        Ok(symbol)
    }
}

impl<R: ACRead, U: UpdatePolicy> Iterator for PpmDecoder<'_, R, U> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.decode().transpose()
    }
}
