//! The buddy arena
//!
//! Owns every block and the per-order index array for one managed address
//! range, and implements the split/coalesce algorithm behind `alloc` and
//! `free`.

use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::{debug, warn};

use crate::{is_aligned, ArenaError, ArenaResult};

use super::block::{Block, BlockHandle, BlockId, BlockState};
use super::block_pool::BlockPool;
use super::order_index::OrderIndex;
use super::stats::{ArenaStats, OrderStats};

/// Default maximum order.
///
/// Linux uses `11` for its page allocator, so just use it too.
pub const DEFAULT_MAX_ORDER: usize = 11;

/// Construction parameters for a [`BuddyArena`].
///
/// A plain value: the arena copies what it needs and keeps no reference to
/// the configuration afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Highest order; the managed range spans `page_size * 2^max_order` bytes.
    pub max_order: usize,
    /// Page size in bytes, must be a power of two.
    pub page_size: usize,
    /// Base address of the managed range.
    pub start_addr: usize,
}

impl ArenaConfig {
    pub const fn new(max_order: usize, page_size: usize, start_addr: usize) -> Self {
        Self {
            max_order,
            page_size,
            start_addr,
        }
    }

    /// Check that the configuration describes a representable arena.
    pub fn validate(&self) -> ArenaResult<()> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(ArenaError::InvalidConfig);
        }
        // The whole range must fit the address space.
        let shift = self.page_size.trailing_zeros() as usize;
        if shift + self.max_order >= usize::BITS as usize {
            return Err(ArenaError::InvalidConfig);
        }
        if self
            .start_addr
            .checked_add(self.page_size << self.max_order)
            .is_none()
        {
            return Err(ArenaError::InvalidConfig);
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ORDER, crate::DEFAULT_PAGE_SIZE, 0)
    }
}

/// Binary buddy allocator over an abstract address range.
///
/// The arena exclusively owns every live block. Callers hold non-owning
/// [`BlockHandle`]s, valid until passed back to [`free`](Self::free).
pub struct BuddyArena {
    max_order: usize,
    page_size: usize,
    shift_count: u32,
    start_addr: usize,
    pool: BlockPool,
    /// One index per order, `0..=max_order`.
    orders: Vec<OrderIndex>,
}

impl BuddyArena {
    /// Create an arena with a single free root block at `max_order`.
    pub fn new(config: ArenaConfig) -> ArenaResult<Self> {
        config.validate()?;

        let mut pool = BlockPool::new();
        let mut orders = Vec::new();
        orders.resize_with(config.max_order + 1, OrderIndex::new);

        let root = pool.insert(Block::root(config.start_addr, config.max_order));
        orders[config.max_order].push_free(&mut pool, root);

        debug!(
            "buddy arena: init max_order {} page_size {:#x} start_addr {:#x}",
            config.max_order, config.page_size, config.start_addr
        );

        Ok(Self {
            max_order: config.max_order,
            page_size: config.page_size,
            shift_count: config.page_size.trailing_zeros(),
            start_addr: config.start_addr,
            pool,
            orders,
        })
    }

    pub const fn max_order(&self) -> usize {
        self.max_order
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn start_addr(&self) -> usize {
        self.start_addr
    }

    /// Size of the managed range in bytes.
    pub const fn total_bytes(&self) -> usize {
        self.page_size << self.max_order
    }

    /// Smallest order whose block size holds `size` bytes, or `None` when no
    /// order of this arena can.
    ///
    /// A zero `size` is treated as a single page.
    fn order_for_size(&self, size: usize) -> Option<usize> {
        let rounded = size.checked_add(self.page_size - 1)?;
        let pages = (rounded >> self.shift_count).max(1);
        if pages > 1usize << self.max_order {
            return None;
        }
        Some(pages.next_power_of_two().trailing_zeros() as usize)
    }

    /// Allocate a block large enough for `size` bytes.
    ///
    /// Returns `None` when the request exceeds the arena or no block of the
    /// required order can be found or manufactured. The arena stays usable
    /// either way.
    pub fn alloc(&mut self, size: usize) -> Option<BlockHandle> {
        let order = self.order_for_size(size)?;
        let id = self.alloc_at(order)?;
        let block = self.pool.block(id);
        Some(BlockHandle {
            id,
            start_addr: block.start_addr,
            order: block.order,
        })
    }

    /// Take a free block at exactly `order`, splitting a higher-order block
    /// when none is available. The returned block sits in the used container.
    fn alloc_at(&mut self, order: usize) -> Option<BlockId> {
        if order > self.max_order {
            return None;
        }

        if let Some(id) = self.orders[order].pick_free() {
            self.orders[order].remove_free(&mut self.pool, id);
            self.orders[order].push_used(&mut self.pool, id);
            return Some(id);
        }

        let parent = self.alloc_at(order + 1)?;
        let second = self.split(parent);
        self.orders[order].remove_free(&mut self.pool, second);
        self.orders[order].push_used(&mut self.pool, second);
        Some(second)
    }

    /// Split `parent` into two children one order below and return the
    /// high-address child. The parent leaves the accounting entirely; at most
    /// one of the parent and its children is ever present in a container.
    fn split(&mut self, parent: BlockId) -> BlockId {
        let (parent_addr, parent_order) = {
            let block = self.pool.block(parent);
            (block.start_addr, block.order)
        };
        debug_assert!(parent_order > 0);

        self.orders[parent_order].remove_used(&mut self.pool, parent);
        self.pool.block_mut(parent).state = BlockState::Split;

        let child_order = parent_order - 1;
        let half = self.page_size << child_order;
        let low = self
            .pool
            .insert(Block::child(parent_addr, child_order, parent));
        let high = self
            .pool
            .insert(Block::child(parent_addr + half, child_order, parent));
        self.pool.block_mut(low).buddy = Some(high);
        self.pool.block_mut(high).buddy = Some(low);

        self.orders[child_order].push_free(&mut self.pool, low);
        self.orders[child_order].push_free(&mut self.pool, high);

        debug!(
            "buddy arena: split {:#x} order {} into {:#x}/{:#x} order {}",
            parent_addr,
            parent_order,
            parent_addr,
            parent_addr + half,
            child_order
        );

        high
    }

    /// Return an allocated block to the arena.
    ///
    /// The handle must refer to a block currently in the used container of
    /// its order; anything else reports [`ArenaError::InvalidFree`] and
    /// leaves the arena unchanged.
    pub fn free(&mut self, handle: BlockHandle) -> ArenaResult<()> {
        if !self.handle_is_live(&handle) {
            warn!(
                "buddy arena: invalid free of addr {:#x} order {}",
                handle.start_addr, handle.order
            );
            return Err(ArenaError::InvalidFree);
        }

        self.orders[handle.order].remove_used(&mut self.pool, handle.id);
        self.release(handle.id);
        Ok(())
    }

    fn handle_is_live(&self, handle: &BlockHandle) -> bool {
        if handle.order > self.max_order {
            return false;
        }
        let span = self.page_size << handle.order;
        let offset = match handle.start_addr.checked_sub(self.start_addr) {
            Some(offset) => offset,
            None => return false,
        };
        if !is_aligned(offset, span) {
            return false;
        }
        match self.pool.get(handle.id) {
            Some(block) => {
                block.state == BlockState::Used
                    && block.start_addr == handle.start_addr
                    && block.order == handle.order
            }
            None => false,
        }
    }

    /// Put a detached block back into the free accounting, coalescing it
    /// with its buddy as far up as possible.
    fn release(&mut self, id: BlockId) {
        let (order, start_addr, buddy, parent) = {
            let block = self.pool.block(id);
            (block.order, block.start_addr, block.buddy, block.parent)
        };

        let buddy_id = match buddy {
            Some(buddy_id) => buddy_id,
            // The root never coalesces.
            None => {
                self.orders[order].push_free(&mut self.pool, id);
                return;
            }
        };

        if self.pool.block(buddy_id).state != BlockState::Free {
            self.orders[order].push_free(&mut self.pool, id);
            return;
        }

        // Both halves are free: destroy the pair and hand the range back to
        // the parent. The parent id must be captured before either child is
        // destroyed.
        self.orders[order].remove_free(&mut self.pool, buddy_id);
        let buddy_addr = self.pool.block(buddy_id).start_addr;
        let merged_addr = start_addr.min(buddy_addr);
        self.pool.remove(id);
        self.pool.remove(buddy_id);

        debug!(
            "buddy arena: coalesce pair at {:#x} order {} into order {}",
            merged_addr,
            order,
            order + 1
        );

        match parent {
            Some(parent_id) => self.release(parent_id),
            None => {
                // A parentless pair reassembles into a root-equivalent block.
                debug_assert!(order < self.max_order);
                let merged = self.pool.insert(Block::root(merged_addr, order + 1));
                self.release(merged);
            }
        }
    }

    /// Read-only snapshot of the per-order free/used counts.
    pub fn stats(&self) -> ArenaStats {
        let mut per_order = Vec::with_capacity(self.max_order + 1);
        let mut free_pages = 0;
        let mut used_pages = 0;
        for (order, index) in self.orders.iter().enumerate() {
            let free_blocks = index.free_count();
            let used_blocks = index.used_count();
            free_pages += free_blocks << order;
            used_pages += used_blocks << order;
            per_order.push(OrderStats {
                order,
                free_blocks,
                used_blocks,
            });
        }
        ArenaStats {
            page_size: self.page_size,
            max_order: self.max_order,
            total_pages: 1usize << self.max_order,
            free_pages,
            used_pages,
            per_order,
        }
    }
}
