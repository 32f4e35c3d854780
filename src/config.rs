use crate::error::{Error, Result};

pub const DEFAULT_ORDER: usize = 6;
pub const MAX_ORDER_LIMIT: usize = 32;

/// Nodes per storage block of a trie's node pool
pub const DEFAULT_BLOCK_NODES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpmConfig {
    /// Longest context (K), the model keeps tries for orders 1..=K
    pub max_order: usize,
    pub block_nodes: usize,
}

impl PpmConfig {
    pub fn with_order(max_order: usize) -> Self {
        Self { max_order, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ORDER_LIMIT).contains(&self.max_order) {
            return Err(Error::InvalidOrder(self.max_order));
        }
        if self.block_nodes == 0 {
            return Err(Error::InvalidConfig("block_nodes must be positive"));
        }
        Ok(())
    }
}

impl Default for PpmConfig {
    fn default() -> Self {
        Self { max_order: DEFAULT_ORDER, block_nodes: DEFAULT_BLOCK_NODES }
    }
}
