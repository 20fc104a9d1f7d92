//! Buddy arena module
//!
//! This module provides the complete buddy system implementation:
//! - Block metadata with buddy and parent links
//! - A pool that owns every live block
//! - Per-order free/used index containers
//! - The arena with the split/coalesce algorithm and statistics

pub mod arena;
pub mod block;
pub mod block_pool;
pub mod order_index;
pub mod stats;

pub use arena::{ArenaConfig, BuddyArena, DEFAULT_MAX_ORDER};
pub use block::BlockHandle;
pub use stats::{ArenaStats, OrderStats, StatsReporter};
