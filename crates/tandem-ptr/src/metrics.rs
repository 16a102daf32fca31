//! Process-wide control-block lifecycle counters.
//!
//! Three monotonic counters track the three lifecycle transitions: block
//! allocated, value destroyed, block freed. The integration tests lean on
//! them for exactly-once assertions; they are cheap enough to stay on
//! unconditionally.

use std::sync::atomic::{AtomicU64, Ordering};

static BLOCKS_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static BLOCKS_FREED: AtomicU64 = AtomicU64::new(0);
static VALUES_DESTROYED: AtomicU64 = AtomicU64::new(0);

/// A snapshot of the lifecycle counters.
///
/// The three fields are read independently; a snapshot taken while other
/// threads allocate is not a consistent cut, but each counter on its own
/// is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStats {
    /// Control blocks allocated since process start.
    pub blocks_allocated: u64,
    /// Control blocks freed since process start.
    pub blocks_freed: u64,
    /// Shared values destroyed since process start.
    pub values_destroyed: u64,
}

impl BlockStats {
    /// Control blocks currently outstanding.
    #[must_use]
    pub const fn live_blocks(&self) -> u64 {
        self.blocks_allocated.saturating_sub(self.blocks_freed)
    }
}

/// Takes a snapshot of the process-wide counters.
#[must_use]
pub fn block_stats() -> BlockStats {
    BlockStats {
        blocks_allocated: BLOCKS_ALLOCATED.load(Ordering::Relaxed),
        blocks_freed: BLOCKS_FREED.load(Ordering::Relaxed),
        values_destroyed: VALUES_DESTROYED.load(Ordering::Relaxed),
    }
}

pub(crate) fn note_block_allocated() {
    BLOCKS_ALLOCATED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_block_freed() {
    BLOCKS_FREED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_value_destroyed() {
    VALUES_DESTROYED.fetch_add(1, Ordering::Relaxed);
}
