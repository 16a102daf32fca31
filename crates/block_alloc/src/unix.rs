use std::io::{self, Error};
use std::mem;
use std::ptr;

/// `posix_memalign` rejects alignments below the pointer size.
const fn min_align() -> usize {
    mem::size_of::<*mut libc::c_void>()
}

pub fn allocate(size: usize, align: usize) -> io::Result<*mut u8> {
    let align = align.max(min_align());

    let mut out: *mut libc::c_void = ptr::null_mut();
    let rc = unsafe { libc::posix_memalign(&mut out, align, size) };
    if rc != 0 {
        // posix_memalign returns the error code directly instead of
        // setting errno.
        return Err(Error::from_raw_os_error(rc));
    }

    Ok(out.cast::<u8>())
}

pub unsafe fn deallocate(ptr: *mut u8, _size: usize, _align: usize) {
    // free() accepts anything posix_memalign handed out.
    unsafe { libc::free(ptr.cast::<libc::c_void>()) };
}
