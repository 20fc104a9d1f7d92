//! Block metadata
//!
//! Represents one contiguous sub-range of the managed address range at a
//! given order, with links to its buddy and parent blocks.

/// Stable identifier of a block inside the arena's pool.
///
/// Buddy and parent links are expressed as identifiers rather than owning
/// references, so the mutually referential sibling pairs stay plain data.
/// The identifier pairs the slot index with the slot's generation at
/// creation time; a recycled slot carries a newer generation, so an
/// identifier held across its block's destruction no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockId {
    pub(crate) index: usize,
    pub(crate) generation: usize,
}

/// Lifecycle state of a block.
///
/// `Free` and `Used` mirror which index container currently holds the block.
/// A `Split` block is held in no container; only its two children are
/// accounted. A destroyed block is a vacant pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    Free,
    Used,
    Split,
}

/// Block metadata
#[derive(Debug, Clone)]
pub(crate) struct Block {
    /// Base address within the managed range, aligned to the block size.
    pub(crate) start_addr: usize,
    /// The block size is `page_size * 2^order`.
    pub(crate) order: usize,
    pub(crate) state: BlockState,
    /// Sibling at the same order sharing the same parent. The root has none.
    pub(crate) buddy: Option<BlockId>,
    /// Block one order above that was split to produce this one.
    pub(crate) parent: Option<BlockId>,
    /// Position inside the free or used vector currently holding the block.
    /// Only meaningful while `state` is `Free` or `Used`.
    pub(crate) slot: usize,
}

impl Block {
    const fn new(start_addr: usize, order: usize, parent: Option<BlockId>) -> Self {
        Self {
            start_addr,
            order,
            state: BlockState::Free,
            buddy: None,
            parent,
            slot: 0,
        }
    }

    /// A block with neither buddy nor parent: the initial root, or a
    /// root-equivalent block reassembled from a parentless pair.
    pub(crate) const fn root(start_addr: usize, order: usize) -> Self {
        Self::new(start_addr, order, None)
    }

    /// One half of a split parent. The buddy link is wired up after both
    /// children exist.
    pub(crate) const fn child(start_addr: usize, order: usize, parent: BlockId) -> Self {
        Self::new(start_addr, order, Some(parent))
    }
}

/// Non-owning reference to an allocated block.
///
/// Returned by [`BuddyArena::alloc`](super::BuddyArena::alloc) and valid
/// until passed back to [`BuddyArena::free`](super::BuddyArena::free).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub(crate) id: BlockId,
    pub(crate) start_addr: usize,
    pub(crate) order: usize,
}

impl BlockHandle {
    /// Base address of the allocated block within the managed range.
    pub const fn start_addr(&self) -> usize {
        self.start_addr
    }

    /// Order of the allocated block; its size is `page_size * 2^order`.
    pub const fn order(&self) -> usize {
        self.order
    }
}
