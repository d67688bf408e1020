//! Block moves over raw native addresses.
//!
//! The overlap test runs on the addresses themselves. Disjoint ranges are
//! viewed as two slices and handed to the same size-class dispatch as
//! [`crate::mover`]; overlapping ranges go to `ptr::copy`, the platform
//! memmove. Nothing here checks bounds.

use crate::mover::{Disjoint, MoveRoute, blocked_copy};

/// Moves `len` bytes from `src` to `dest`; the ranges may overlap.
///
/// # Safety
///
/// - `src` must be valid for reads of `len` bytes and `dest` valid for writes
///   of `len` bytes, both within live allocations.
/// - The source bytes must be initialized.
/// - With `len == 0` the pointers are not dereferenced.
pub unsafe fn move_memory(dest: *mut u8, src: *const u8, len: usize) -> MoveRoute {
    if len == 0 {
        return MoveRoute::Empty;
    }
    let (d, s) = (dest as usize, src as usize);
    if d.abs_diff(s) >= len {
        // SAFETY: caller guarantees both ranges are valid for `len` bytes, and
        // the overlap test proves they do not share any byte, so a shared and
        // a mutable view may coexist.
        let (dest, src) = unsafe {
            (
                std::slice::from_raw_parts_mut(dest, len),
                std::slice::from_raw_parts(src, len),
            )
        };
        blocked_copy(&mut Disjoint { dest, src }, len);
        MoveRoute::Blocked
    } else {
        // SAFETY: caller guarantees validity; `ptr::copy` permits overlap.
        unsafe { std::ptr::copy(src, dest, len) };
        MoveRoute::Fallback
    }
}
