//! The crate's recoverable error type.

use std::alloc::Layout;
use std::error::Error;
use std::fmt;
use std::io;

/// Control-block allocation failed.
///
/// Returned by [`Shared::try_new`](crate::Shared::try_new). Nothing was
/// constructed and no partial state survives: the value passed in was
/// dropped, and no block memory is outstanding.
#[derive(Debug)]
pub struct AllocError {
    layout: Layout,
    source: io::Error,
}

impl AllocError {
    pub(crate) fn new(layout: Layout, source: io::Error) -> Self {
        Self { layout, source }
    }

    /// The layout of the control block that could not be allocated.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "control block allocation of {} bytes (align {}) failed",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl Error for AllocError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}
