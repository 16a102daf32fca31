//! The weak (observing) handle.

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

use crate::block::{Block, Nullable, WEAK_LOCKED};
use crate::heap;
use crate::strong::Shared;

/// A non-owning observer of a shared heap value.
///
/// A `Weak<T>` never keeps the value alive. It can check liveness with
/// [`Weak::expired`] and attempt to promote itself to an owner with
/// [`Weak::upgrade`]; what it holds alive is only the control block, so
/// liveness checks stay valid after the value is gone.
///
/// Back-edges in an owning graph belong here: a cycle of [`Shared`]
/// handles leaks, a cycle broken by one `Weak` does not.
///
/// # Examples
///
/// ```
/// use tandem_ptr::Shared;
///
/// let s = Shared::new(5);
/// let w = Shared::downgrade(&s);
/// drop(s);
///
/// assert!(w.expired());
/// assert!(w.upgrade().is_none());
/// ```
pub struct Weak<T> {
    ptr: Nullable<Block<T>>,
}

impl<T> Weak<T> {
    /// Wraps a block pointer whose weak count already includes this
    /// handle's unit.
    pub(crate) const unsafe fn from_block(ptr: NonNull<Block<T>>) -> Self {
        Self {
            ptr: Nullable::new(ptr),
        }
    }

    /// Attempts to promote this observer to an owner.
    ///
    /// Returns `None` once the value is dead (or for a dangling handle).
    /// The promotion never races the destruction path into observing a
    /// destroyed value: the increment is a compare-and-swap conditioned on
    /// the strong count still being positive, retried with the freshly
    /// reported count until it either lands before the destroying
    /// decrement or observes zero. Zero is final — no path increments the
    /// count back up — so the loop terminates.
    #[must_use]
    pub fn upgrade(&self) -> Option<Shared<T>> {
        let ptr = self.ptr.as_option()?;
        let block = unsafe { ptr.as_ref() };

        let mut expected = block.strong.load(Ordering::Relaxed);
        loop {
            if expected == 0 {
                return None;
            }
            match block.strong.compare_exchange_weak(
                expected,
                expected + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                // The CAS already installed the new owner's unit.
                Ok(_) => return Some(unsafe { Shared::from_block(ptr) }),
                Err(actual) => expected = actual,
            }
        }
    }

    /// Whether the value has been destroyed.
    ///
    /// `true` for a dangling handle. Monotonic per block: once expired,
    /// expired forever.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.strong_count() == 0
    }

    /// Number of strong owners of the observed block; 0 once the value is
    /// dead or for a dangling handle.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        match self.ptr.as_option() {
            Some(ptr) => unsafe { ptr.as_ref() }.strong_count(),
            None => 0,
        }
    }

    /// Number of weak observers of the block; 0 for a dangling handle.
    #[must_use]
    pub fn weak_count(&self) -> usize {
        match self.ptr.as_option() {
            Some(ptr) => unsafe { ptr.as_ref() }.weak_observers(),
            None => 0,
        }
    }

    /// Whether two observers reference the same block. Two dangling
    /// handles compare equal.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }
}

/// Surrenders one weak unit of `ptr`'s block, freeing the block when it
/// was the last.
///
/// Safe to run in the Dying state: the value — if it ever died — was
/// destroyed by the strong decrement that zeroed the other counter, and
/// the implicit unit kept this counter from reaching zero before then.
///
/// # Safety
///
/// The caller must own the unit being released and must not touch the
/// block through this pointer afterwards.
pub(crate) unsafe fn release_weak<T>(ptr: NonNull<Block<T>>) {
    if unsafe { ptr.as_ref() }.weak.fetch_sub(1, Ordering::Release) == 1 {
        // Pairs with the Release decrements of every other holder so the
        // value's destruction is complete before the memory goes back.
        fence(Ordering::Acquire);
        unsafe { heap::deallocate_block(ptr) };
    }
}

impl<T> Clone for Weak<T> {
    fn clone(&self) -> Self {
        let Some(ptr) = self.ptr.as_option() else {
            return Self {
                ptr: Nullable::null(),
            };
        };
        let block = unsafe { ptr.as_ref() };

        let mut cur = block.weak.load(Ordering::Relaxed);
        loop {
            if cur == WEAK_LOCKED {
                std::hint::spin_loop();
                cur = block.weak.load(Ordering::Relaxed);
                continue;
            }
            match block.weak.compare_exchange_weak(
                cur,
                cur + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self { ptr: self.ptr },
                Err(actual) => cur = actual,
            }
        }
    }
}

impl<T> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.as_option() {
            // SAFETY: this handle owned one weak unit and is going away.
            unsafe { release_weak(ptr) };
        }
    }
}

impl<T> Default for Weak<T> {
    /// A dangling observer: never upgrades, always expired.
    fn default() -> Self {
        Self {
            ptr: Nullable::null(),
        }
    }
}

impl<T> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Weak)")
    }
}

unsafe impl<T: Send + Sync> Send for Weak<T> {}
unsafe impl<T: Send + Sync> Sync for Weak<T> {}
