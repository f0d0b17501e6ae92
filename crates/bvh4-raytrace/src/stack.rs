//! Fixed-capacity traversal stack.

/// Stack slots available to one traversal.
///
/// The implicit 4-ary layout cannot be deeper than 16 levels with 32-bit
/// node indices, and near-first traversal keeps at most three siblings
/// per level waiting, so 64 slots are never exhausted by a valid array.
pub const STACK_SIZE: usize = 64;

/// LIFO stack of node indices backed by an inline array.
#[derive(Debug, Clone)]
pub struct TraversalStack {
    data: [u32; STACK_SIZE],
    len: usize,
}

impl TraversalStack {
    /// Empty stack.
    pub fn new() -> Self {
        Self {
            data: [0; STACK_SIZE],
            len: 0,
        }
    }

    /// Push a node index.
    ///
    /// # Panics
    ///
    /// Panics when all [`STACK_SIZE`] slots are in use. That can only
    /// happen for a tree the builder should never have produced.
    #[inline]
    pub fn push(&mut self, node: u32) {
        assert!(
            self.len < STACK_SIZE,
            "traversal stack overflow: tree deeper than {STACK_SIZE} slots allow"
        );
        self.data[self.len] = node;
        self.len += 1;
    }

    /// Pop the most recently pushed index.
    #[inline]
    pub fn pop(&mut self) -> Option<u32> {
        self.len = self.len.checked_sub(1)?;
        Some(self.data[self.len])
    }

    /// Number of indices waiting.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for TraversalStack {
    fn default() -> Self {
        Self::new()
    }
}
