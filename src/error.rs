use std::{io, path::PathBuf};

use thiserror::Error;

use crate::config::MAX_ORDER_LIMIT;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The node pool can't grow any further. There is no degraded mode.
    #[error("node pool exhausted at {nodes} nodes")]
    PoolExhausted { nodes: usize },

    #[error("max order {0} is outside 1..={max}", max = MAX_ORDER_LIMIT)]
    InvalidOrder(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("corrupt model: {0}")]
    CorruptModel(String),

    /// The compressed stream ran out before its EOF symbol
    #[error("compressed stream is truncated or corrupt")]
    CorruptStream,

    #[error("model is already in use by another encoder")]
    ModelBusy,

    #[error("{} doesn't match its input", .0.display())]
    Mismatch(PathBuf),
}
