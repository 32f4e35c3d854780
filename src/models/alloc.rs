use std::ops::{Index, IndexMut};

use log::debug;

use crate::error::{Error, Result};

/// Handle of a node slot inside a `NodePool`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdx(u32);

impl NodeIdx {
    fn new(idx: usize) -> Option<Self> {
        u32::try_from(idx).ok().map(Self)
    }

    #[inline(always)]
    fn index(self) -> usize {
        crate::usize!(self.0)
    }
}

/// Plain data trie node, recycled slots are simply overwritten
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Node {
    pub value: u16,
    pub count: u16,
    pub escape: u16,
    pub child: Option<NodeIdx>,   // first child
    pub sibling: Option<NodeIdx>, // next sibling, or next free slot once released
}

/// Node arena with an intrusive free list.
///
/// Slots come from the free list first, otherwise they are carved from the
/// current block. Storage grows a whole block at a time and is never handed
/// back, released slots are only recycled.
#[derive(Debug, Clone)]
pub struct NodePool {
    nodes: Vec<Node>,
    free: Option<NodeIdx>,
    block_nodes: usize,
    live: usize,
}

impl NodePool {
    pub fn new(block_nodes: usize) -> Self {
        debug_assert!(block_nodes > 0);
        Self { nodes: Vec::new(), free: None, block_nodes, live: 0 }
    }

    pub fn alloc(&mut self, node: Node) -> Result<NodeIdx> {
        if let Some(idx) = self.free {
            let slot = &mut self.nodes[idx.index()];
            self.free = slot.sibling;
            *slot = node;
            self.live += 1;
            return Ok(idx);
        }

        if self.nodes.len() == self.nodes.capacity() {
            self.grow()?;
        }
        let nodes = self.nodes.len();
        let idx = NodeIdx::new(nodes).ok_or(Error::PoolExhausted { nodes })?;
        self.nodes.push(node);
        self.live += 1;
        Ok(idx)
    }

    /// Returns the slot to the free list, the node must already be unlinked
    pub fn release(&mut self, idx: NodeIdx) {
        debug_assert!(self.live > 0);
        self.nodes[idx.index()] = Node { sibling: self.free, ..Node::default() };
        self.free = Some(idx);
        self.live -= 1;
    }

    /// Iterates over the children of `parent` in sibling order
    pub fn children(&self, parent: NodeIdx) -> Children<'_> {
        Children { pool: self, next: self[parent].child }
    }

    /// Nodes currently in use
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots carved so far (in use or free)
    pub fn slots(&self) -> usize {
        self.nodes.len()
    }

    fn grow(&mut self) -> Result<()> {
        let nodes = self.nodes.len();
        self.nodes
            .try_reserve_exact(self.block_nodes)
            .map_err(|_| Error::PoolExhausted { nodes })?;
        debug!("node pool: new block, {} slots -> capacity {}", nodes, self.nodes.capacity());
        Ok(())
    }
}

pub struct Children<'a> {
    pool: &'a NodePool,
    next: Option<NodeIdx>,
}

impl Iterator for Children<'_> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let idx = self.next?;
        self.next = self.pool[idx].sibling;
        Some(idx)
    }
}

impl Index<NodeIdx> for NodePool {
    type Output = Node;

    #[inline(always)]
    fn index(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.index()]
    }
}

impl IndexMut<NodeIdx> for NodePool {
    #[inline(always)]
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Node {
        &mut self.nodes[idx.index()]
    }
}
