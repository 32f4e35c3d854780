pub mod alloc;
pub mod context_buffer;
pub mod persist;
pub mod ppm;
pub mod shared;
pub mod trie;
pub mod uniform;

pub use self::{
    context_buffer::ContextBuffer,
    ppm::{Adaptive, Frozen, PpmDecoder, PpmEncoder, PpmModel, UpdatePolicy},
    shared::SharedModel,
    trie::{BranchStats, ContextTrie},
};

/// A byte, or `EOF_SYMBOL`
pub type Symbol = u16;

pub const NO_OF_CHARS: u16 = 256;
pub const EOF_SYMBOL: Symbol = NO_OF_CHARS;
/// Alphabet of the uniform fallback, bytes and EOF (escapes are never coded there)
pub const NO_OF_SYMBOLS: u16 = NO_OF_CHARS + 1;
