//! Native allocations handed to a [`crate::SafeBuffer`].
//!
//! The native layer (OS heaps, mapped views, foreign libraries) owns the
//! memory; this module only describes it. Dropping an allocation returns the
//! memory to whoever provided it. The handle decides *when* that drop happens.

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

use crate::error::BufferError;

/// An already-allocated native region.
///
/// # Safety
///
/// Implementors guarantee that `base()` is stable for the life of the value,
/// that the region is valid for reads and writes of at least the number of
/// bytes a buffer is later initialized with, that those bytes are initialized,
/// and that no one else mutates the region while it is wrapped. When
/// `byte_len()` returns `Some(n)`, the region spans at least `n` bytes.
pub unsafe trait NativeAllocation: Send + Sync {
    /// First byte of the region.
    fn base(&self) -> NonNull<u8>;

    /// Known extent of the region, if the provider tracks it.
    fn byte_len(&self) -> Option<usize>;
}

/// Zeroed block from the global allocator.
pub struct HeapAllocation {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the block is uniquely owned; access is mediated by the handle.
unsafe impl Send for HeapAllocation {}
// SAFETY: shared access only hands out the base address.
unsafe impl Sync for HeapAllocation {}

impl HeapAllocation {
    /// Alignment of every heap block.
    pub const ALIGN: usize = 16;

    /// Allocate `size` zeroed bytes.
    pub fn zeroed(size: usize) -> Result<Self, BufferError> {
        let layout = Layout::from_size_align(size, Self::ALIGN)
            .map_err(|_| BufferError::AllocationFailed { size })?;
        if size == 0 {
            // No block; an address with no provenance that still honors ALIGN.
            let ptr = NonNull::new(std::ptr::without_provenance_mut::<u8>(Self::ALIGN))
                .ok_or(BufferError::AllocationFailed { size })?;
            return Ok(Self { ptr, layout });
        }
        // SAFETY: layout has non-zero size.
        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(BufferError::AllocationFailed { size })?;
        Ok(Self { ptr, layout })
    }

    /// Allocated size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }
}

impl Drop for HeapAllocation {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated in `zeroed` with this exact layout.
            unsafe { std::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

impl fmt::Debug for HeapAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocation")
            .field("ptr", &self.ptr)
            .field("len", &self.layout.size())
            .finish()
    }
}

// SAFETY: `zeroed` allocates and initializes exactly `layout.size()` bytes.
unsafe impl NativeAllocation for HeapAllocation {
    fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    fn byte_len(&self) -> Option<usize> {
        Some(self.layout.size())
    }
}

/// Callback returning a foreign region to its owner.
pub type ReleaseFn = Box<dyn FnOnce(NonNull<u8>) + Send + Sync>;

/// A region owned by some other allocator, released through a callback.
pub struct ForeignAllocation {
    ptr: NonNull<u8>,
    len: Option<usize>,
    release: Option<ReleaseFn>,
}

// SAFETY: `from_raw` requires the region to be usable from any thread.
unsafe impl Send for ForeignAllocation {}
// SAFETY: as above; the release callback is only run from `drop`.
unsafe impl Sync for ForeignAllocation {}

impl ForeignAllocation {
    /// Wrap a foreign region; `release` runs exactly once when it is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must satisfy the [`NativeAllocation`] contract until `release`
    /// runs, and must be usable from any thread. `len`, when given, must not
    /// exceed the real extent.
    pub unsafe fn from_raw(
        ptr: NonNull<u8>,
        len: Option<usize>,
        release: impl FnOnce(NonNull<u8>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            ptr,
            len,
            release: Some(Box::new(release)),
        }
    }

    /// Wrap a region whose lifetime is managed elsewhere; dropping does nothing.
    ///
    /// # Safety
    ///
    /// Same as [`ForeignAllocation::from_raw`], for as long as the wrapper or
    /// any buffer built on it is alive.
    pub unsafe fn borrowed(ptr: NonNull<u8>, len: Option<usize>) -> Self {
        Self {
            ptr,
            len,
            release: None,
        }
    }
}

impl Drop for ForeignAllocation {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.ptr);
        }
    }
}

impl fmt::Debug for ForeignAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignAllocation")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("owned", &self.release.is_some())
            .finish()
    }
}

// SAFETY: upheld by the `from_raw`/`borrowed` contracts.
unsafe impl NativeAllocation for ForeignAllocation {
    fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    fn byte_len(&self) -> Option<usize> {
        self.len
    }
}
