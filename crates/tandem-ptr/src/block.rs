//! The control block shared by every handle to one value.

use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sentinel value pinning the weak count while `Shared::get_mut` probes
/// for uniqueness. No real count ever reaches it.
pub(crate) const WEAK_LOCKED: usize = usize::MAX;

/// The shared bookkeeping record: two counters and the value, co-allocated.
///
/// Every block moves through three states, each transition fired by exactly
/// one decrementer (a `fetch_sub` reports its pre-decrement value to exactly
/// one caller):
///
/// - **Live**: `strong > 0`, the value may be read through any owner.
/// - **Dying**: `strong == 0`, `weak > 0` — the value has been destroyed in
///   place but observers still hold the memory.
/// - **Dead**: `weak == 0` — the memory has been returned to the allocator.
///
/// Destruction of the value happens-before deallocation of the block. The
/// two releases are gated by different counters, so each gets its own
/// Release/Acquire pair: either counter can be the last to reach zero.
#[repr(C)]
pub(crate) struct Block<T> {
    /// Number of `Shared` owners. The value is alive iff this is non-zero,
    /// and it never rises again once it reaches zero.
    pub(crate) strong: AtomicUsize,
    /// Number of `Weak` observers plus one implicit unit meaning "the value
    /// itself is alive", held collectively by the strong handles and
    /// released by whichever owner destroys the value.
    pub(crate) weak: AtomicUsize,
    /// The shared value, destroyed in place by the last strong owner.
    value: ManuallyDrop<T>,
}

impl<T> Block<T> {
    /// A fresh block: one strong owner, no observers, the implicit unit.
    pub(crate) fn new(value: T) -> Self {
        Self {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            value: ManuallyDrop::new(value),
        }
    }

    /// Read access to the value.
    ///
    /// Callers must hold a strong unit for the duration of the borrow.
    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    /// Raw pointer to the value slot.
    ///
    /// Field access goes through `addr_of_mut` so no reference to the whole
    /// block is materialized; handles on other threads take shared
    /// references to the block concurrently.
    pub(crate) fn value_ptr(ptr: NonNull<Self>) -> *mut T {
        unsafe { std::ptr::addr_of_mut!((*ptr.as_ptr()).value).cast::<T>() }
    }

    /// Destroys the value in place. The block's memory stays alive.
    ///
    /// # Safety
    ///
    /// Must be called exactly once per block, by the decrementer that
    /// observed the strong count at 1, after an `Acquire` fence ordered it
    /// behind every other owner's release.
    pub(crate) unsafe fn drop_value(ptr: NonNull<Self>) {
        unsafe {
            std::ptr::drop_in_place(Self::value_ptr(ptr));
        }
        crate::metrics::note_value_destroyed();
        crate::tracing::internal::value_destroyed();
    }

    /// Current strong count.
    pub(crate) fn strong_count(&self) -> usize {
        self.strong.load(Ordering::Acquire)
    }

    /// Number of weak observers, excluding the implicit unit while the
    /// value is alive. Reads `WEAK_LOCKED` as zero observers: the probe
    /// only ever pins a count of exactly 1.
    pub(crate) fn weak_observers(&self) -> usize {
        match self.weak.load(Ordering::Acquire) {
            WEAK_LOCKED => 0,
            n if self.strong.load(Ordering::Acquire) > 0 => n - 1,
            n => n,
        }
    }
}

/// A nullable raw pointer with "empty handle" semantics.
pub(crate) struct Nullable<T>(*mut T);

impl<T> Nullable<T> {
    pub(crate) const fn new(ptr: NonNull<T>) -> Self {
        Self(ptr.as_ptr())
    }

    pub(crate) const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub(crate) fn is_null(self) -> bool {
        self.0.is_null()
    }

    pub(crate) fn as_option(self) -> Option<NonNull<T>> {
        NonNull::new(self.0)
    }

    pub(crate) const fn as_ptr(self) -> *mut T {
        self.0
    }
}

impl<T> Clone for Nullable<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Nullable<T> {}

impl<T> PartialEq for Nullable<T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_block_counts() {
        let block = Block::new(7_u32);
        assert_eq!(block.strong.load(Ordering::Relaxed), 1);
        assert_eq!(block.weak.load(Ordering::Relaxed), 1);
        assert_eq!(*block.value(), 7);
        assert_eq!(block.weak_observers(), 0);
    }

    #[test]
    fn weak_observers_after_death() {
        // Dying state: strong at zero, two observers left. The implicit
        // unit is gone, so the raw count is the observer count.
        let block = Block::new(0_u8);
        block.strong.store(0, Ordering::Relaxed);
        block.weak.store(2, Ordering::Relaxed);
        assert_eq!(block.weak_observers(), 2);
        assert_eq!(block.strong_count(), 0);
    }

    #[test]
    fn nullable_roundtrip() {
        let mut x = 5_i32;
        let p = Nullable::new(NonNull::from(&mut x));
        assert!(!p.is_null());
        assert_eq!(p.as_option().unwrap().as_ptr(), std::ptr::addr_of_mut!(x));

        let n = Nullable::<i32>::null();
        assert!(n.is_null());
        assert!(n.as_option().is_none());
        assert!(p != n);
    }
}
