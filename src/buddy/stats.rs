//! Statistics and debugging for the buddy arena
//!
//! Provides the read-only per-order projection of the arena's accounting
//! and a log-based table reporter.

use alloc::vec::Vec;

/// Free/used block counts for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStats {
    pub order: usize,
    pub free_blocks: usize,
    pub used_blocks: usize,
}

/// Snapshot of the arena's per-order accounting.
///
/// Split blocks appear in no count; their children do, so the page totals
/// always cover the whole managed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaStats {
    pub page_size: usize,
    pub max_order: usize,
    /// Total number of pages in the managed range.
    pub total_pages: usize,
    /// Pages covered by blocks in free containers.
    pub free_pages: usize,
    /// Pages covered by blocks in used containers.
    pub used_pages: usize,
    /// One entry per order, ascending from order 0.
    pub per_order: Vec<OrderStats>,
}

impl ArenaStats {
    /// Counts for a single order, if it exists.
    pub fn order(&self, order: usize) -> Option<OrderStats> {
        self.per_order.get(order).copied()
    }
}

/// Statistics table reporter
pub struct StatsReporter;

impl StatsReporter {
    /// Log the per-order table in the classic Order / Free / Used layout.
    /// This is a standalone function to keep allocation logic clean.
    #[allow(unused_variables)]
    pub fn log_table(stats: &ArenaStats) {
        {
            #[cfg(feature = "log")]
            use log::info;
            info!("===============================================================");
            info!("{:>21}{:>21}{:>21}", "Order", "Free Entries", "Used Entries");
            info!("===============================================================");
            for entry in &stats.per_order {
                info!(
                    "{:>21}{:>21}{:>21}",
                    entry.order, entry.free_blocks, entry.used_blocks
                );
            }
            info!(
                "total {} pages, free {} pages, used {} pages",
                stats.total_pages, stats.free_pages, stats.used_pages
            );
        }
    }
}
