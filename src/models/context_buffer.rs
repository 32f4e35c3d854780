/// The last K symbols seen, oldest first.
///
/// Ring over a fixed store, pushing into a full buffer drops the oldest symbol.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    data: Box<[u8]>,
    head: usize, // position of the oldest symbol
    len: usize,
}

impl ContextBuffer {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self { data: vec![0; capacity].into_boxed_slice(), head: 0, len: 0 }
    }

    pub fn push(&mut self, symbol: u8) {
        let cap = self.data.len();
        if self.len < cap {
            self.data[(self.head + self.len) % cap] = symbol;
            self.len += 1;
        } else {
            self.data[self.head] = symbol;
            self.head = (self.head + 1) % cap;
        }
    }

    /// i-th retained symbol counting from the oldest, callers bound-check with `len`
    #[inline(always)]
    pub fn get(&self, i: usize) -> u8 {
        debug_assert!(i < self.len, "index {i} out of buffer of length {}", self.len);
        self.data[(self.head + i) % self.data.len()]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Symbols from `offset` up to the newest, the path of an order `len - offset` context
    pub fn suffix(&self, offset: usize) -> impl Iterator<Item = u8> + '_ {
        (offset..self.len).map(move |i| self.get(i))
    }
}

// Same window of symbols, wherever the ring happens to start
impl PartialEq for ContextBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.suffix(0).eq(other.suffix(0))
    }
}

impl Eq for ContextBuffer {}

#[cfg(test)]
mod tests {
    use super::ContextBuffer;

    fn contents(buf: &ContextBuffer) -> Vec<u8> {
        buf.suffix(0).collect()
    }

    #[test]
    fn fills_then_slides() {
        let mut buf = ContextBuffer::new(3);
        assert!(buf.is_empty());

        buf.push(b'a');
        assert_eq!(contents(&buf), b"a");

        buf.push(b'b');
        buf.push(b'c');
        assert_eq!(contents(&buf), b"abc");

        for i in 0..9 {
            buf.push(b'0' + i);
        }
        assert_eq!(contents(&buf), b"678");
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get(0), b'6');
        assert_eq!(buf.get(2), b'8');
    }

    #[test]
    fn suffix_is_the_tail() {
        let mut buf = ContextBuffer::new(4);
        b"hello".iter().for_each(|&b| buf.push(b));
        assert_eq!(buf.suffix(1).collect::<Vec<_>>(), b"llo");
        assert_eq!(buf.suffix(4).count(), 0);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut buf = ContextBuffer::new(2);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        buf.clear();
        assert_eq!(buf.len(), 0);
        buf.push(9);
        assert_eq!(contents(&buf), [9]);
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn equality_ignores_ring_position() {
        let (mut wrapped, mut straight) = (ContextBuffer::new(4), ContextBuffer::new(4));
        b"hello".iter().for_each(|&b| wrapped.push(b));
        b"ello".iter().for_each(|&b| straight.push(b));
        assert_eq!(wrapped, straight);

        straight.push(b'!');
        assert_ne!(wrapped, straight);

        // stale slots left behind by clear don't count
        let mut cleared = ContextBuffer::new(4);
        b"abcd".iter().for_each(|&b| cleared.push(b));
        cleared.clear();
        cleared.push(b'x');
        let mut fresh = ContextBuffer::new(4);
        fresh.push(b'x');
        assert_eq!(cleared, fresh);
    }
}
