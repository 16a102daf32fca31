//! Handle lifecycle tracing support.
//!
//! When the `tracing` feature is enabled, this module emits structured
//! events at the three lifecycle transitions of a control block. With the
//! feature disabled every helper compiles to a no-op.

#[cfg(feature = "tracing")]
pub(crate) mod internal {
    /// Emitted once per control block, right after allocation.
    pub(crate) fn block_allocated(bytes: usize) {
        tracing::trace!(bytes, "block_allocated");
    }

    /// Emitted by the strong decrement that destroyed the value.
    pub(crate) fn value_destroyed() {
        tracing::trace!("value_destroyed");
    }

    /// Emitted by the weak decrement that freed the block.
    pub(crate) fn block_freed(bytes: usize) {
        tracing::trace!(bytes, "block_freed");
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) mod internal {
    pub(crate) const fn block_allocated(_bytes: usize) {}

    pub(crate) const fn value_destroyed() {}

    pub(crate) const fn block_freed(_bytes: usize) {}
}
