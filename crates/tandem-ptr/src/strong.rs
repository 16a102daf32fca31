//! The strong (owning) handle.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, Ordering};

use crate::block::{Block, Nullable, WEAK_LOCKED};
use crate::error::AllocError;
use crate::heap;
use crate::weak::Weak;

/// An owning handle to a shared heap value.
///
/// Every live `Shared<T>` owns one unit of its block's strong count. The
/// value stays alive exactly as long as at least one owner exists; the
/// last owner to go destroys it in place, and the block's memory follows
/// once the last [`Weak`] observer is gone too.
///
/// A `Shared` can also be *empty* (see [`Shared::empty`]): it references
/// nothing, [`Shared::use_count`] reports 0, and dereferencing it panics.
/// [`Shared::try_deref`] is the fallible sibling.
///
/// # Thread Safety
///
/// `Shared<T>` is `Send` and `Sync` when `T: Send + Sync`. Cloning and
/// dropping from any number of threads is safe; the counter protocol
/// guarantees the value is destroyed exactly once and never observed
/// after destruction.
///
/// # Examples
///
/// ```
/// use tandem_ptr::Shared;
///
/// let x = Shared::new(String::from("hello"));
/// let y = x.clone();
/// assert!(Shared::ptr_eq(&x, &y));
/// assert_eq!(Shared::use_count(&x), 2);
/// ```
pub struct Shared<T> {
    ptr: Nullable<Block<T>>,
    _marker: PhantomData<Block<T>>,
}

impl<T> Shared<T> {
    /// Allocates a control block and moves `value` into it.
    ///
    /// # Panics
    ///
    /// Aborts allocation-failure handling via [`std::alloc::handle_alloc_error`].
    /// Use [`Shared::try_new`] to handle allocation failure as a value.
    pub fn new(value: T) -> Self {
        match Self::try_new(value) {
            Ok(shared) => shared,
            Err(err) => std::alloc::handle_alloc_error(err.layout()),
        }
    }

    /// Allocates a control block and moves `value` into it, reporting
    /// allocation failure to the caller.
    ///
    /// On failure no block exists, no partial state survives, and `value`
    /// has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when the allocator cannot provide memory for
    /// the block.
    pub fn try_new(value: T) -> Result<Self, AllocError> {
        let ptr = heap::allocate_block::<T>()?;
        // SAFETY: freshly allocated, sized and aligned for Block<T>.
        unsafe {
            ptr.as_ptr().write(Block::new(value));
        }
        Ok(Self {
            ptr: Nullable::new(ptr),
            _marker: PhantomData,
        })
    }

    /// An empty handle referencing nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: Nullable::null(),
            _marker: PhantomData,
        }
    }

    /// Whether this handle references nothing.
    #[must_use]
    pub fn is_empty(this: &Self) -> bool {
        this.ptr.is_null()
    }

    /// Wraps a block pointer whose strong count already includes this
    /// handle's unit.
    pub(crate) const unsafe fn from_block(ptr: NonNull<Block<T>>) -> Self {
        Self {
            ptr: Nullable::new(ptr),
            _marker: PhantomData,
        }
    }

    /// Attempts to dereference, returning `None` for an empty handle.
    #[must_use]
    pub fn try_deref(this: &Self) -> Option<&T> {
        let ptr = this.ptr.as_option()?;
        // SAFETY: this handle owns a strong unit, so the value is alive.
        Some(unsafe { ptr.as_ref() }.value())
    }

    /// Exclusive access to the value, granted only when this is provably
    /// the sole handle of either kind.
    ///
    /// The check happens at call time: the weak count is pinned first so
    /// no observer can be minted (or upgrade) between the uniqueness check
    /// and the borrow, then the strong count is required to be exactly 1.
    /// Skipping either half would hand out `&mut T` while another thread
    /// can still read the value.
    ///
    /// Returns `None` for an empty handle, when other owners exist, or
    /// when any observer exists.
    ///
    /// # Examples
    ///
    /// ```
    /// use tandem_ptr::Shared;
    ///
    /// let mut x = Shared::new(1);
    /// *Shared::get_mut(&mut x).unwrap() += 1;
    ///
    /// let y = x.clone();
    /// assert!(Shared::get_mut(&mut x).is_none());
    /// drop(y);
    /// assert_eq!(*Shared::get_mut(&mut x).unwrap(), 2);
    /// ```
    pub fn get_mut(this: &mut Self) -> Option<&mut T> {
        let ptr = this.ptr.as_option()?;
        let block = unsafe { ptr.as_ref() };

        // Pin the weak count at its implicit-unit-only state. While the
        // pin is held, downgrade and Weak::clone spin instead of minting
        // an observer under us.
        if block
            .weak
            .compare_exchange(1, WEAK_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        let unique = block.strong.load(Ordering::Relaxed) == 1;
        block.weak.store(1, Ordering::Release);

        if !unique {
            return None;
        }

        // Order the exclusive borrow behind the Release decrement of every
        // owner that previously read the value.
        fence(Ordering::Acquire);
        // SAFETY: strong == 1 with no observers; we hold the only handle
        // and `this` is borrowed mutably for the lifetime of the result.
        unsafe { Some(&mut *Block::value_ptr(ptr)) }
    }

    /// Number of strong owners; 0 for an empty handle.
    #[must_use]
    pub fn use_count(this: &Self) -> usize {
        match this.ptr.as_option() {
            Some(ptr) => unsafe { ptr.as_ref() }.strong_count(),
            None => 0,
        }
    }

    /// Number of weak observers (the implicit unit excluded); 0 for an
    /// empty handle.
    #[must_use]
    pub fn weak_count(this: &Self) -> usize {
        match this.ptr.as_option() {
            Some(ptr) => unsafe { ptr.as_ref() }.weak_observers(),
            None => 0,
        }
    }

    /// Creates a [`Weak`] observer for this handle's block.
    ///
    /// # Panics
    ///
    /// Panics when called on an empty handle.
    ///
    /// # Examples
    ///
    /// ```
    /// use tandem_ptr::Shared;
    ///
    /// let s = Shared::new(3);
    /// let w = Shared::downgrade(&s);
    /// assert_eq!(*w.upgrade().unwrap(), 3);
    /// ```
    #[must_use]
    pub fn downgrade(this: &Self) -> Weak<T> {
        let ptr = this
            .ptr
            .as_option()
            .expect("downgraded an empty Shared handle");
        let block = unsafe { ptr.as_ref() };

        let mut cur = block.weak.load(Ordering::Relaxed);
        loop {
            if cur == WEAK_LOCKED {
                // get_mut is probing for uniqueness; wait out its two-step
                // window instead of minting an observer under it.
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
                Ok(_) => return unsafe { Weak::from_block(ptr) },
                Err(actual) => cur = actual,
            }
        }
    }

    /// Detaches this handle, releasing its strong unit.
    ///
    /// If this was the last owner the value is destroyed now; the block
    /// follows once no observer holds it either. The handle itself becomes
    /// empty and reusable. Resetting an empty handle is a no-op.
    pub fn reset(this: &mut Self) {
        if let Some(ptr) = this.ptr.as_option() {
            this.ptr = Nullable::null();
            // SAFETY: the unit this handle owned is surrendered exactly
            // once; the handle is already empty.
            unsafe { release_strong(ptr) };
        }
    }

    /// Whether two handles reference the same block. Two empty handles
    /// compare equal.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }

    /// Raw pointer to the value; null for an empty handle.
    #[must_use]
    pub fn as_ptr(this: &Self) -> *const T {
        match this.ptr.as_option() {
            Some(ptr) => Block::value_ptr(ptr).cast_const(),
            None => std::ptr::null(),
        }
    }
}

/// Surrenders one strong unit of `ptr`'s block.
///
/// The pre-decrement observation routes exactly one caller into the
/// destruction path: see the value, tear it down, then hand back the
/// implicit weak unit (which may in turn free the block).
///
/// # Safety
///
/// The caller must own the unit being released and must not touch the
/// block through this pointer afterwards.
pub(crate) unsafe fn release_strong<T>(ptr: NonNull<Block<T>>) {
    if unsafe { ptr.as_ref() }.strong.fetch_sub(1, Ordering::Release) != 1 {
        return;
    }

    // This thread observed the count at 1: it is the unique destroyer.
    // The fence pairs with the Release decrements of the other owners so
    // their reads of the value are complete before it is torn down.
    fence(Ordering::Acquire);
    unsafe {
        Block::drop_value(ptr);
        crate::weak::release_weak(ptr);
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        let Some(ptr) = self.ptr.as_option() else {
            return Self::empty();
        };
        // A live owner pins the count above zero, so a plain increment
        // cannot race the destruction path. The count is not
        // overflow-checked (documented limit).
        unsafe { ptr.as_ref() }.strong.fetch_add(1, Ordering::Relaxed);
        Self {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        // Same-block assignment must not tear down the value it is about
        // to re-reference; take the new unit before the old one goes.
        if Self::ptr_eq(self, source) {
            return;
        }
        *self = source.clone();
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.as_option() {
            // SAFETY: this handle owned one strong unit and is going away.
            unsafe { release_strong(ptr) };
        }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics when the handle is empty. Use [`Shared::try_deref`] for
    /// fallible access.
    fn deref(&self) -> &Self::Target {
        Shared::try_deref(self).expect("dereferenced an empty Shared handle")
    }
}

impl<T> Default for Shared<T> {
    /// The empty handle.
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::try_deref(self) {
            Some(value) => f.debug_tuple("Shared").field(value).finish(),
            None => write!(f, "Shared(<empty>)"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl<T> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.ptr.as_ptr(), f)
    }
}

impl<T: PartialEq> PartialEq for Shared<T> {
    /// Compares by value; empty handles compare equal to each other and
    /// unequal to everything else.
    fn eq(&self, other: &Self) -> bool {
        match (Self::try_deref(self), Self::try_deref(other)) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Eq> Eq for Shared<T> {}

impl<T: PartialOrd> PartialOrd for Shared<T> {
    /// Compares by value; an empty handle orders before any non-empty one.
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (Self::try_deref(self), Self::try_deref(other)) {
            (Some(a), Some(b)) => a.partial_cmp(b),
            (None, None) => Some(std::cmp::Ordering::Equal),
            (None, Some(_)) => Some(std::cmp::Ordering::Less),
            (Some(_), None) => Some(std::cmp::Ordering::Greater),
        }
    }
}

impl<T: Ord> Ord for Shared<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (Self::try_deref(self), Self::try_deref(other)) {
            (Some(a), Some(b)) => a.cmp(b),
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
        }
    }
}

impl<T: std::hash::Hash> std::hash::Hash for Shared<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if let Some(value) = Self::try_deref(self) {
            value.hash(state);
        }
    }
}

impl<T> AsRef<T> for Shared<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> std::borrow::Borrow<T> for Shared<T> {
    fn borrow(&self) -> &T {
        self
    }
}

unsafe impl<T: Send + Sync> Send for Shared<T> {}
unsafe impl<T: Send + Sync> Sync for Shared<T> {}
