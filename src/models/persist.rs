//! Model files.
//!
//! ```text
//! "PPMT" | version: u8 | max order: u8 | context length: u8 | context bytes (oldest first)
//! then one node record per order 1..=K:
//!   record = 0                                        (no node)
//!          | 1 value:u32le count:u32le escape:u32le record(child) record(sibling)
//! ```

use std::io::{self, ErrorKind, Read, Write};

use log::debug;

use super::{
    alloc::{Node, NodeIdx, NodePool},
    context_buffer::ContextBuffer,
    ppm::PpmModel,
    trie::ContextTrie,
    EOF_SYMBOL,
};
use crate::config::{PpmConfig, DEFAULT_BLOCK_NODES};
use crate::entropy_coding::arithmetic_coder::MAX_FREQUENCY;
use crate::error::{Error, Result};
use crate::{u16, u8};

const MAGIC: &[u8; 4] = b"PPMT";
const VERSION: u8 = 1;

impl PpmModel {
    /// Writes the statistics and the current context
    pub fn dump<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[VERSION, u8!(self.config.max_order), u8!(self.buffer.len())])?;
        let context: Vec<u8> = self.buffer.suffix(0).collect();
        writer.write_all(&context)?;

        for trie in &self.tries {
            write_nodes(&trie.pool, trie.root, &mut writer)?;
        }
        writer.flush()?;
        debug!("dumped order-{} model, {} nodes", self.config.max_order, self.node_count());
        Ok(())
    }

    /// Reads a model written by `dump`, it codes exactly like the dumped one
    pub fn load<R: Read>(mut reader: R) -> Result<Self> {
        let [m0, m1, m2, m3, version, max_order, context_len] = read_bytes::<7, _>(&mut reader)?;
        if &[m0, m1, m2, m3] != MAGIC {
            return Err(Error::CorruptModel("not a model file".into()));
        }
        if version != VERSION {
            return Err(Error::CorruptModel(format!("unsupported version {version}")));
        }

        let config = PpmConfig { max_order: usize::from(max_order), block_nodes: DEFAULT_BLOCK_NODES };
        config.validate()?;
        if usize::from(context_len) > config.max_order {
            return Err(Error::CorruptModel(format!("context of {context_len} symbols in an order-{max_order} model")));
        }

        let mut buffer = ContextBuffer::new(config.max_order);
        for _ in 0..context_len {
            let [byte] = read_bytes::<1, _>(&mut reader)?;
            buffer.push(byte);
        }

        let mut tries = Vec::with_capacity(config.max_order);
        for order in 1..=config.max_order {
            let mut pool = NodePool::new(config.block_nodes);
            let root = read_nodes(&mut pool, &mut reader, 0, order)?;
            if root.is_some_and(|root| pool[root].sibling.is_some()) {
                return Err(Error::CorruptModel(format!("order {order} has more than one root")));
            }
            tries.push(ContextTrie::from_parts(pool, root));
        }

        let model = PpmModel::from_parts(config, tries, buffer);
        debug!("loaded order-{} model, {} nodes", max_order, model.node_count());
        Ok(model)
    }
}

fn write_nodes<W: Write>(pool: &NodePool, first: Option<NodeIdx>, writer: &mut W) -> io::Result<()> {
    // siblings iteratively, children recursively (depth is bounded by the order)
    let mut next = first;
    while let Some(idx) = next {
        let node = &pool[idx];
        writer.write_all(&[1])?;
        writer.write_all(&u32::from(node.value).to_le_bytes())?;
        writer.write_all(&u32::from(node.count).to_le_bytes())?;
        writer.write_all(&u32::from(node.escape).to_le_bytes())?;
        write_nodes(pool, node.child, writer)?;
        next = node.sibling;
    }
    writer.write_all(&[0])
}

/// Reads a sibling chain at `depth` (root = 0, branches = `order`, leaves = `order + 1`)
fn read_nodes<R: Read>(pool: &mut NodePool, reader: &mut R, depth: usize, order: usize) -> Result<Option<NodeIdx>> {
    let mut first = None;
    let mut prev: Option<NodeIdx> = None;

    loop {
        match read_bytes::<1, _>(reader)? {
            [0] => break,
            [1] => {}
            [flag] => return Err(Error::CorruptModel(format!("bad node flag {flag}"))),
        }
        if depth > order + 1 {
            return Err(Error::CorruptModel(format!("node below the leaves of order {order}")));
        }

        let value = read_field(reader, "value")?;
        let count = read_field(reader, "count")?;
        let escape = read_field(reader, "escape")?;
        if value > EOF_SYMBOL || (depth <= order && value > 0xff) {
            return Err(Error::CorruptModel(format!("symbol {value} at depth {depth}")));
        }

        let idx = pool.alloc(Node { value, count, escape, ..Node::default() })?;
        let child = read_nodes(pool, reader, depth + 1, order)?;
        pool[idx].child = child;
        if depth == order {
            check_branch(pool, idx)?;
        }

        match prev {
            Some(prev) => pool[prev].sibling = Some(idx),
            None => first = Some(idx),
        }
        prev = Some(idx);
    }

    Ok(first)
}

// A branch must code like a live one: balanced, under the coder's limit, no empty slices
fn check_branch(pool: &NodePool, branch: NodeIdx) -> Result<()> {
    let node = pool[branch];
    let mut sum = u32::from(node.escape);
    for idx in pool.children(branch) {
        if pool[idx].count == 0 {
            return Err(Error::CorruptModel("leaf with a zero count".into()));
        }
        sum += u32::from(pool[idx].count);
    }

    let balanced = sum == u32::from(node.count) && u32::from(node.count) < MAX_FREQUENCY;
    if !balanced || node.escape == 0 || node.child.is_none() {
        return Err(Error::CorruptModel(format!("unbalanced branch (count {}, escape {})", node.count, node.escape)));
    }
    Ok(())
}

fn read_field<R: Read>(reader: &mut R, name: &str) -> Result<u16> {
    let raw = u32::from_le_bytes(read_bytes(reader)?);
    if raw > u32::from(u16::MAX) {
        return Err(Error::CorruptModel(format!("{name} {raw} doesn't fit 16 bits")));
    }
    Ok(u16!(raw))
}

fn read_bytes<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0; N];
    reader.read_exact(&mut buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => Error::CorruptModel("truncated model".into()),
        _ => Error::Io(err),
    })?;
    Ok(buf)
}
