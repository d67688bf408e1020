//! nativebuf: bounds-checked, reference-counted views over native memory.
//!
//! A [`SafeBuffer`] wraps one native allocation, is sized exactly once, and
//! moves bytes in and out of it through the overlap-safe mover in
//! `nativebuf-core`. The C ABI entry points below expose the same mover to
//! foreign callers.

pub mod buffer;
pub mod config;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod native;
pub mod state;

use std::ffi::{c_int, c_void};

pub use buffer::{SafeBuffer, UNINITIALIZED};
pub use error::{ArgumentError, BufferError, RangeLimit};
pub use handle::{NativeHandle, PinGuard};
pub use metrics::{BufferMetrics, MetricsSnapshot, global_metrics};
pub use native::{ForeignAllocation, HeapAllocation, NativeAllocation, ReleaseFn};
pub use state::{BufferState, HandleState};

pub use nativebuf_core::{
    CopyRange, LayoutError, MoveError, MoveRoute, PointerWidth, SizeClass, TypeDescriptor,
};

/// Overlap-safe move of `len` bytes from `src` to `dest`. Returns `dest`.
///
/// Null pointers with a non-zero length return null without touching memory.
///
/// # Safety
///
/// `src` must be valid for reads and `dest` for writes of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nativebuf_memmove(
    dest: *mut c_void,
    src: *const c_void,
    len: usize,
) -> *mut c_void {
    if len == 0 {
        return dest;
    }
    if dest.is_null() || src.is_null() {
        return std::ptr::null_mut();
    }

    // SAFETY: non-null checked above; caller keeps the C ABI validity contract.
    let route = unsafe { nativebuf_core::raw::move_memory(dest.cast::<u8>(), src.cast::<u8>(), len) };
    global_metrics().record_move(route, len);
    dest
}

/// Move `src_len` bytes into a destination of `dest_capacity` bytes.
///
/// Returns `0` on success and `-1` when `src_len > dest_capacity` or a
/// pointer is null while `src_len` is non-zero. Nothing is written on failure.
///
/// # Safety
///
/// `src` must be valid for reads of `src_len` bytes and `dest` for writes of
/// `dest_capacity` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nativebuf_memory_copy_checked(
    src: *const c_void,
    dest: *mut c_void,
    dest_capacity: usize,
    src_len: usize,
) -> c_int {
    if src_len > dest_capacity {
        log::debug!("nativebuf: checked copy of {src_len} bytes into {dest_capacity} refused");
        return -1;
    }
    if src_len == 0 {
        return 0;
    }
    if dest.is_null() || src.is_null() {
        return -1;
    }

    // SAFETY: src_len <= dest_capacity, so both ranges are covered by the
    // caller's validity contract.
    let route =
        unsafe { nativebuf_core::raw::move_memory(dest.cast::<u8>(), src.cast::<u8>(), src_len) };
    global_metrics().record_move(route, src_len);
    0
}
