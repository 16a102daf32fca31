use std::io::{self, Error};
use std::mem;

use windows_sys::Win32::System::Memory::{GetProcessHeap, HeapAlloc, HeapFree};

/// The process heap only guarantees 16-byte alignment, so requests are
/// over-allocated and the base pointer is stashed in the slot directly
/// below the aligned address for `deallocate` to recover.
pub fn allocate(size: usize, align: usize) -> io::Result<*mut u8> {
    let slot = mem::size_of::<*mut u8>();
    let total = size
        .checked_add(align)
        .and_then(|n| n.checked_add(slot))
        .ok_or_else(|| Error::from(io::ErrorKind::InvalidInput))?;

    unsafe {
        let base = HeapAlloc(GetProcessHeap(), 0, total).cast::<u8>();
        if base.is_null() {
            return Err(Error::from(io::ErrorKind::OutOfMemory));
        }

        let unaligned = base.add(slot) as usize;
        let aligned = (unaligned + align - 1) & !(align - 1);
        let out = aligned as *mut u8;
        out.cast::<*mut u8>().sub(1).write_unaligned(base);

        Ok(out)
    }
}

pub unsafe fn deallocate(ptr: *mut u8, _size: usize, _align: usize) {
    unsafe {
        let base = ptr.cast::<*mut u8>().sub(1).read_unaligned();
        HeapFree(GetProcessHeap(), 0, base.cast());
    }
}
