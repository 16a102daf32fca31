//! Allocation layer between the handles and the allocator.
//!
//! The handles never talk to `block_alloc` directly; everything funnels
//! through here so the lifecycle counters (and, under `test-util`, the
//! live-allocation table) see every block exactly once.

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::block::Block;
use crate::error::AllocError;

/// Allocates uninitialized memory for one `Block<T>`.
pub(crate) fn allocate_block<T>() -> Result<NonNull<Block<T>>, AllocError> {
    let layout = Layout::new::<Block<T>>();
    let ptr = block_alloc::allocate(layout.size(), layout.align())
        .map_err(|source| AllocError::new(layout, source))?;

    #[cfg(feature = "test-util")]
    live::insert(ptr.as_ptr() as usize);

    crate::metrics::note_block_allocated();
    crate::tracing::internal::block_allocated(layout.size());

    Ok(ptr.cast::<Block<T>>())
}

/// Returns a block's memory to the allocator.
///
/// # Safety
///
/// `ptr` must come from [`allocate_block`] with the same `T` and not have been freed
/// before; the value inside must already have been destroyed.
pub(crate) unsafe fn deallocate_block<T>(ptr: NonNull<Block<T>>) {
    let layout = Layout::new::<Block<T>>();

    #[cfg(feature = "test-util")]
    live::remove(ptr.as_ptr() as usize);

    unsafe { block_alloc::deallocate(ptr.cast::<u8>(), layout.size(), layout.align()) };

    crate::metrics::note_block_freed();
    crate::tracing::internal::block_freed(layout.size());
}

/// Number of control blocks currently outstanding in this process.
#[cfg(feature = "test-util")]
#[must_use]
pub fn live_block_count() -> usize {
    live::count()
}

#[cfg(feature = "test-util")]
mod live {
    use std::collections::BTreeSet;

    use parking_lot::Mutex;

    static LIVE: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

    pub(super) fn insert(addr: usize) {
        assert!(
            LIVE.lock().insert(addr),
            "block {addr:#x} allocated twice without a free"
        );
    }

    pub(super) fn remove(addr: usize) {
        assert!(
            LIVE.lock().remove(&addr),
            "freeing block {addr:#x} that is not live"
        );
    }

    pub(super) fn count() -> usize {
        LIVE.lock().len()
    }
}
