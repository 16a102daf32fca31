use std::io;
use std::ptr::NonNull;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;

/// Allocates `size` bytes aligned to `align`.
///
/// `align` must be a power of two and `size` must be non-zero; anything else
/// is rejected with `InvalidInput` before reaching the OS. The returned
/// memory is uninitialized.
///
/// Memory obtained here must be returned through [`deallocate`] with the
/// same `size` and `align`.
pub fn allocate(size: usize, align: usize) -> io::Result<NonNull<u8>> {
    if size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "size must be greater than 0",
        ));
    }
    if !align.is_power_of_two() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "align must be a power of two",
        ));
    }

    let ptr = os::allocate(size, align)?;
    NonNull::new(ptr).ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

/// Releases memory previously obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must have been returned by [`allocate`] with the same `size` and
/// `align`, and must not have been deallocated before. The memory must no
/// longer be accessed after this call.
pub unsafe fn deallocate(ptr: NonNull<u8>, size: usize, align: usize) {
    unsafe { os::deallocate(ptr.as_ptr(), size, align) };
}
