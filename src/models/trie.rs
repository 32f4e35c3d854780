use std::io;

use log::trace;

use super::{
    alloc::{Node, NodeIdx, NodePool},
    context_buffer::ContextBuffer,
    Symbol,
};
use crate::entropy_coding::{arithmetic_coder::MAX_FREQUENCY, ACRead, ACWrite, ArithmeticCoder};
use crate::error::Result;
use crate::u16;

/// Children at or below this count are pruned on rescale
pub const MIN_FREQUENCY: u16 = 1;
pub const RESCALE_FACTOR: u16 = 2;

/// Branch and leaf resolved by the last encode/decode, reused by `update`
#[derive(Debug, Clone, Copy)]
struct Cursor {
    branch: NodeIdx,
    leaf: Option<NodeIdx>,
}

/// Adaptive statistics of every context of one order.
///
/// Below the root, each observed context is a path of spine nodes (one per
/// context byte) ending in a branch node. The branch's children are the leaves,
/// one per symbol seen after that context. A branch's `count` is always the sum
/// of its leaves' counts plus its `escape` count.
#[derive(Debug, Clone)]
pub struct ContextTrie {
    pub(super) pool: NodePool,
    pub(super) root: Option<NodeIdx>,
    cursor: Option<Cursor>,
}

/// Snapshot of one branch, for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStats {
    pub count: u16,
    pub escape: u16,
    pub children: Vec<(Symbol, u16)>,
}

impl ContextTrie {
    pub fn new(block_nodes: usize) -> Self {
        Self { pool: NodePool::new(block_nodes), root: None, cursor: None }
    }

    pub(super) fn from_parts(pool: NodePool, root: Option<NodeIdx>) -> Self {
        Self { pool, root, cursor: None }
    }

    /// Codes `symbol` under the context `buffer[offset..]`.
    ///
    /// Returns `false` on escape. A context that was never seen escapes
    /// silently, without touching the coder.
    pub fn encode<W: ACWrite>(
        &mut self,
        buffer: &ContextBuffer,
        offset: usize,
        symbol: Symbol,
        coder: &mut ArithmeticCoder<W>,
    ) -> io::Result<bool> {
        self.cursor = None;
        let Some(branch) = self.find_branch(buffer, offset) else {
            return Ok(false);
        };

        let Node { count, escape, .. } = self.pool[branch];
        let total = u32::from(count);
        let mut cum = 0;
        let mut leaf = None;
        for idx in self.pool.children(branch) {
            let node = &self.pool[idx];
            if node.value == symbol {
                leaf = Some(idx);
                break;
            }
            cum += u32::from(node.count);
        }
        self.cursor = Some(Cursor { branch, leaf });

        match leaf {
            Some(idx) => {
                coder.encode(cum, cum + u32::from(self.pool[idx].count), total)?;
                Ok(true)
            }
            None => {
                // escape owns the top slice
                coder.encode(total - u32::from(escape), total, total)?;
                Ok(false)
            }
        }
    }

    /// Mirror of `encode`, `None` is an escape
    pub fn decode<R: ACRead>(
        &mut self,
        buffer: &ContextBuffer,
        offset: usize,
        coder: &mut ArithmeticCoder<R>,
    ) -> io::Result<Option<Symbol>> {
        self.cursor = None;
        let Some(branch) = self.find_branch(buffer, offset) else {
            return Ok(None);
        };

        let Node { count, escape, .. } = self.pool[branch];
        let total = u32::from(count);
        let target = coder.cum_freq(total);
        let mut cum = 0;
        for idx in self.pool.children(branch) {
            let node = self.pool[idx];
            let high = cum + u32::from(node.count);
            if target < high {
                self.cursor = Some(Cursor { branch, leaf: Some(idx) });
                coder.pop_symbol(cum, high, total)?;
                return Ok(Some(node.value));
            }
            cum = high;
        }

        debug_assert_eq!(cum, total - u32::from(escape));
        self.cursor = Some(Cursor { branch, leaf: None });
        coder.pop_symbol(total - u32::from(escape), total, total)?;
        Ok(None)
    }

    /// Counts `symbol` under the context `buffer[offset..]`, creating the
    /// context path and the leaf when missing. A new leaf also bumps the
    /// branch's escape count.
    pub fn update(&mut self, buffer: &ContextBuffer, offset: usize, symbol: Symbol) -> Result<()> {
        let cursor = self.cursor.take();
        let branch = match cursor {
            Some(cursor) => cursor.branch,
            None => self.make_path(buffer, offset)?,
        };
        debug_assert_eq!(Some(branch), self.find_branch(buffer, offset), "stale path cache");

        let leaf = cursor
            .and_then(|cursor| cursor.leaf)
            .or_else(|| self.find_child(branch, symbol));
        match leaf {
            Some(leaf) => {
                debug_assert_eq!(self.pool[leaf].value, symbol);
                self.pool[leaf].count += 1;
                self.pool[branch].count += 1;
            }
            None => {
                self.append_child(branch, Node { value: symbol, count: 1, ..Node::default() })?;
                let node = &mut self.pool[branch];
                node.escape += 1;
                node.count += 2;
            }
        }

        if u32::from(self.pool[branch].count) >= MAX_FREQUENCY {
            self.rescale(branch);
        }
        Ok(())
    }

    /// Drops the path cached by the last encode/decode
    pub fn forget_path(&mut self) {
        self.cursor = None;
    }

    pub fn branch_stats(&self, buffer: &ContextBuffer, offset: usize) -> Option<BranchStats> {
        let branch = self.find_branch(buffer, offset)?;
        let Node { count, escape, .. } = self.pool[branch];
        let children = self
            .pool
            .children(branch)
            .map(|idx| (self.pool[idx].value, self.pool[idx].count))
            .collect();
        Some(BranchStats { count, escape, children })
    }

    /// Nodes in use, root and spines included
    pub fn node_count(&self) -> usize {
        self.pool.len()
    }

    fn find_child(&self, parent: NodeIdx, value: u16) -> Option<NodeIdx> {
        self.pool.children(parent).find(|&idx| self.pool[idx].value == value)
    }

    fn find_branch(&self, buffer: &ContextBuffer, offset: usize) -> Option<NodeIdx> {
        let mut node = self.root?;
        for byte in buffer.suffix(offset) {
            node = self.find_child(node, byte.into())?;
        }
        Some(node)
    }

    fn make_path(&mut self, buffer: &ContextBuffer, offset: usize) -> Result<NodeIdx> {
        let mut node = match self.root {
            Some(root) => root,
            None => {
                let root = self.pool.alloc(Node::default())?;
                self.root = Some(root);
                root
            }
        };

        for byte in buffer.suffix(offset) {
            let value = byte.into();
            node = match self.find_child(node, value) {
                Some(child) => child,
                None => self.append_child(node, Node { value, ..Node::default() })?,
            };
        }
        Ok(node)
    }

    fn append_child(&mut self, parent: NodeIdx, node: Node) -> Result<NodeIdx> {
        let idx = self.pool.alloc(node)?;
        match self.pool.children(parent).last() {
            Some(last) => self.pool[last].sibling = Some(idx),
            None => self.pool[parent].child = Some(idx),
        }
        Ok(idx)
    }

    /// Scales the branch's counts down, pruning rare children (never the last one)
    fn rescale(&mut self, branch: NodeIdx) {
        let before = self.pool[branch];
        let mut remaining = self.pool.children(branch).count();
        let mut pruned = 0;
        let mut sum = 0;

        let mut prev: Option<NodeIdx> = None;
        let mut next = before.child;
        while let Some(idx) = next {
            let node = self.pool[idx];
            next = node.sibling;

            if node.count <= MIN_FREQUENCY && remaining > 1 {
                match prev {
                    Some(prev) => self.pool[prev].sibling = next,
                    None => self.pool[branch].child = next,
                }
                self.pool.release(idx);
                remaining -= 1;
                pruned += 1;
            } else {
                let count = node.count.div_ceil(RESCALE_FACTOR);
                self.pool[idx].count = count;
                sum += u32::from(count);
                prev = Some(idx);
            }
        }

        let escape = before.escape.div_ceil(RESCALE_FACTOR);
        let node = &mut self.pool[branch];
        node.escape = escape;
        node.count = u16!(sum + u32::from(escape));

        trace!(
            "rescale: count {} -> {}, escape {} -> {}, pruned {}",
            before.count,
            node.count,
            before.escape,
            node.escape,
            pruned
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{BranchStats, ContextTrie, MIN_FREQUENCY};
    use crate::entropy_coding::{
        arithmetic_coder::MAX_FREQUENCY, ACReader, ACWriter, ArithmeticCoder, BitCounter,
    };
    use crate::models::{context_buffer::ContextBuffer, Symbol};

    fn buffer(bytes: &[u8]) -> ContextBuffer {
        let mut buf = ContextBuffer::new(bytes.len().max(1));
        bytes.iter().for_each(|&b| buf.push(b));
        buf
    }

    fn assert_balanced(stats: &BranchStats) {
        let sum: u32 = stats.children.iter().map(|&(_, c)| u32::from(c)).sum();
        assert_eq!(u32::from(stats.count), sum + u32::from(stats.escape));
    }

    #[test]
    fn unseen_context_escapes_silently() {
        let mut trie = ContextTrie::new(16);
        let buf = buffer(b"ab");
        let mut ac = ArithmeticCoder::new_coder(BitCounter::new());
        assert!(!trie.encode(&buf, 0, b'c'.into(), &mut ac).unwrap());
        assert_eq!(ac.get_ref().bits(), 0);
        assert_eq!(trie.branch_stats(&buf, 0), None);
    }

    #[test]
    fn update_builds_path_and_leaf() {
        let mut trie = ContextTrie::new(16);
        let buf = buffer(b"ab");
        trie.update(&buf, 0, b'c'.into()).unwrap();
        trie.update(&buf, 0, b'c'.into()).unwrap();
        trie.update(&buf, 0, b'd'.into()).unwrap();

        let stats = trie.branch_stats(&buf, 0).unwrap();
        assert_eq!(stats.children, [(Symbol::from(b'c'), 2), (Symbol::from(b'd'), 1)]);
        assert_eq!(stats.escape, 2);
        assert_eq!(stats.count, 5);
        assert_balanced(&stats);
        // root + 'a' + 'b' + two leaves
        assert_eq!(trie.node_count(), 5);

        // the order 1 suffix "b" is a different context
        assert_eq!(trie.branch_stats(&buf, 1), None);
    }

    #[test]
    fn contexts_share_spine_prefix() {
        let mut trie = ContextTrie::new(16);
        trie.update(&buffer(b"ab"), 0, 1).unwrap();
        trie.update(&buffer(b"ac"), 0, 1).unwrap();
        // root, 'a', 'b', 'c', two leaves
        assert_eq!(trie.node_count(), 6);
    }

    #[test]
    fn encode_then_decode_matches_and_escapes() {
        let buf = buffer(b"x");
        let mut enc_trie = ContextTrie::new(16);
        for sym in [b'a', b'a', b'b'] {
            enc_trie.update(&buf, 0, sym.into()).unwrap();
        }
        let mut dec_trie = enc_trie.clone();

        let input: [Symbol; 4] = [b'a'.into(), b'z'.into(), b'b'.into(), b'a'.into()];
        let mut ac = ArithmeticCoder::new_coder(ACWriter::new(Vec::new()));
        let matched: Vec<bool> = input
            .iter()
            .map(|&sym| {
                let hit = enc_trie.encode(&buf, 0, sym, &mut ac).unwrap();
                enc_trie.update(&buf, 0, sym).unwrap();
                hit
            })
            .collect();
        assert_eq!(matched, [true, false, true, true]);
        ac.flush().unwrap();
        let compressed = ac.into_inner().into_inner();

        let mut ac = ArithmeticCoder::new_decoder(ACReader::new(compressed.as_slice())).unwrap();
        for &sym in &input {
            let decoded = dec_trie.decode(&buf, 0, &mut ac).unwrap();
            match decoded {
                Some(decoded) => assert_eq!(decoded, sym),
                None => assert_eq!(sym, Symbol::from(b'z')),
            }
            dec_trie.update(&buf, 0, sym).unwrap();
        }
        assert_eq!(enc_trie.branch_stats(&buf, 0), dec_trie.branch_stats(&buf, 0));
    }

    #[test]
    fn rescale_keeps_counts_balanced() {
        let buf = buffer(b"x");
        let mut trie = ContextTrie::new(64);
        for sym in [b'a', b'a', b'a', b'b'] {
            trie.update(&buf, 0, sym.into()).unwrap();
        }

        let mut rescaled = false;
        let mut last_count = 0;
        for _ in 0..20_000 {
            trie.update(&buf, 0, b'c'.into()).unwrap();
            let stats = trie.branch_stats(&buf, 0).unwrap();
            assert_balanced(&stats);
            assert!(u32::from(stats.count) < MAX_FREQUENCY);
            if stats.count < last_count && !rescaled {
                rescaled = true;
                // 'b' had a single hit and is pruned, the rest are halved (rounding up)
                assert_eq!(stats.children, [(Symbol::from(b'a'), 2), (Symbol::from(b'c'), 8188)]);
                assert_eq!(stats.escape, 2);
                assert_eq!(stats.count, 8192);
            }
            last_count = stats.count;
        }
        assert!(rescaled);
        // root, 'x', 'a', 'c'
        assert_eq!(trie.node_count(), 4);
    }

    #[test]
    fn rescale_never_empties_a_branch() {
        let buf = buffer(b"x");
        let mut trie = ContextTrie::new(16);
        trie.update(&buf, 0, 1).unwrap();
        trie.update(&buf, 0, 2).unwrap();

        let branch = trie.find_branch(&buf, 0).unwrap();
        trie.rescale(branch);
        let stats = trie.branch_stats(&buf, 0).unwrap();
        assert_eq!(stats.children, [(2, MIN_FREQUENCY)]);
        assert_eq!(stats.escape, 1);
        assert_balanced(&stats);
    }

    #[test]
    fn pruned_slots_are_recycled() {
        let buf = buffer(b"x");
        let mut trie = ContextTrie::new(16);
        trie.update(&buf, 0, 1).unwrap();
        trie.update(&buf, 0, 2).unwrap();
        let branch = trie.find_branch(&buf, 0).unwrap();
        trie.rescale(branch);
        let slots = trie.pool.slots();

        trie.update(&buf, 0, 3).unwrap();
        assert_eq!(trie.pool.slots(), slots);
        assert_eq!(trie.node_count(), 4);
    }
}
