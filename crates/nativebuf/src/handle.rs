//! Reference-counted ownership of one native allocation.
//!
//! The handle packs its whole lifecycle into one atomic word: bit 0 marks the
//! handle closed, bit 1 marks the allocation released, and the remaining bits
//! count outstanding pins. Every transition is a compare-exchange on that
//! word, so a pin can never be taken after close, the count never goes
//! negative, and exactly one thread observes the transition that frees the
//! memory: either `close` with no pins, or the release of the last pin after
//! close.
//!
//! Pins taken without a guard are also tallied in a separate counter. Only
//! [`NativeHandle::release_unguarded`] may return those, so an unmatched
//! explicit release can never give back a pin a live guard still holds.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::BufferError;
use crate::metrics::{BufferMetrics, global_metrics};
use crate::native::NativeAllocation;
use crate::state::HandleState;

const CLOSED: usize = 0b01;
const RELEASED: usize = 0b10;
const PIN_SHIFT: u32 = 2;
const PIN_ONE: usize = 1 << PIN_SHIFT;

const fn pins(word: usize) -> usize {
    word >> PIN_SHIFT
}

/// Shared owner of a native allocation.
pub struct NativeHandle {
    allocation: Mutex<Option<Box<dyn NativeAllocation>>>,
    base: NonNull<u8>,
    known_len: Option<usize>,
    state: AtomicUsize,
    unguarded: AtomicUsize,
}

// SAFETY: `base` is a plain address; the allocation itself is Send + Sync and
// guarded by the mutex.
unsafe impl Send for NativeHandle {}
// SAFETY: as above; all state changes go through atomics or the mutex.
unsafe impl Sync for NativeHandle {}

impl NativeHandle {
    /// Take ownership of `allocation`.
    #[must_use]
    pub fn new(allocation: Box<dyn NativeAllocation>) -> Self {
        let base = allocation.base();
        let known_len = allocation.byte_len();
        Self {
            allocation: Mutex::new(Some(allocation)),
            base,
            known_len,
            state: AtomicUsize::new(0),
            unguarded: AtomicUsize::new(0),
        }
    }

    /// Base address of the native region.
    #[must_use]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Extent reported by the allocation, if any.
    #[must_use]
    pub fn known_len(&self) -> Option<usize> {
        self.known_len
    }

    /// Outstanding pins.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        pins(self.state.load(Ordering::Acquire))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> HandleState {
        let word = self.state.load(Ordering::Acquire);
        if word & RELEASED != 0 {
            HandleState::Released
        } else if word & CLOSED != 0 {
            HandleState::Closed
        } else {
            HandleState::Open
        }
    }

    /// Pins taken through [`NativeHandle::add_ref_unguarded`] and not yet returned.
    #[must_use]
    pub fn unguarded_count(&self) -> usize {
        self.unguarded.load(Ordering::Acquire)
    }

    /// Take one pin that no guard owns. Fails once the handle is closed.
    pub fn add_ref_unguarded(&self) -> Result<(), BufferError> {
        self.add_ref()?;
        self.unguarded.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Return one pin taken by [`NativeHandle::add_ref_unguarded`]. Fails
    /// without side effects when none is outstanding, even if guards still
    /// hold pins.
    pub fn release_unguarded(&self) -> Result<(), BufferError> {
        if self
            .unguarded
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            BufferMetrics::inc(&global_metrics().release_underflows);
            log::warn!(
                "nativebuf: unguarded release without matching add-ref at {:p}",
                self.base
            );
            return Err(BufferError::ReleaseUnderflow);
        }
        self.release()
    }

    /// Take one pin. Fails once the handle is closed.
    pub(crate) fn add_ref(&self) -> Result<(), BufferError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & CLOSED != 0 {
                return Err(BufferError::Closed);
            }
            match self.state.compare_exchange_weak(
                current,
                current + PIN_ONE,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    BufferMetrics::inc(&global_metrics().pins_acquired);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Return one pin. Frees the allocation when this was the last pin of a
    /// closed handle. Fails without side effects when no pin is outstanding.
    pub(crate) fn release(&self) -> Result<(), BufferError> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if pins(current) == 0 {
                BufferMetrics::inc(&global_metrics().release_underflows);
                log::warn!("nativebuf: release without matching acquire at {:p}", self.base);
                return Err(BufferError::ReleaseUnderflow);
            }
            let mut next = current - PIN_ONE;
            let frees = pins(next) == 0 && next & CLOSED != 0 && next & RELEASED == 0;
            if frees {
                next |= RELEASED;
            }
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    BufferMetrics::inc(&global_metrics().pins_released);
                    if frees {
                        self.free();
                    }
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark the handle closed. The allocation is freed now if no pins are
    /// outstanding, otherwise by the release of the last pin. Idempotent.
    pub fn close(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & CLOSED != 0 {
                return;
            }
            let frees = pins(current) == 0;
            let next = if frees {
                current | CLOSED | RELEASED
            } else {
                current | CLOSED
            };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    BufferMetrics::inc(&global_metrics().handles_closed);
                    if frees {
                        self.free();
                    } else {
                        log::debug!(
                            "nativebuf: close of {:p} deferred behind {} pin(s)",
                            self.base,
                            pins(current)
                        );
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn free(&self) {
        if let Some(allocation) = self.allocation.lock().take() {
            log::trace!("nativebuf: releasing native region {:p}", self.base);
            BufferMetrics::inc(&global_metrics().regions_freed);
            drop(allocation);
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("base", &self.base)
            .field("known_len", &self.known_len)
            .field("state", &self.state())
            .field("pins", &self.pin_count())
            .finish()
    }
}

/// Scoped pin on a buffer's native region.
///
/// While a guard lives the region cannot be freed, even if the owning
/// [`crate::SafeBuffer`] is closed or dropped. Dropping the guard releases
/// the pin.
pub struct PinGuard {
    handle: Arc<NativeHandle>,
    len: usize,
}

impl PinGuard {
    pub(crate) fn acquire(handle: &Arc<NativeHandle>, len: usize) -> Result<Self, BufferError> {
        handle.add_ref()?;
        Ok(Self {
            handle: Arc::clone(handle),
            len,
        })
    }

    /// Raw base address of the pinned region.
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.handle.base().as_ptr()
    }

    /// Initialized capacity of the pinned region.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        // SAFETY: the pin keeps the allocation alive, and `len` never exceeds
        // the size the buffer was initialized with, which the allocation
        // contract covers.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Callers must hold exclusive access to the owning buffer.
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `bytes`; exclusivity comes from the `&mut SafeBuffer`
        // every caller holds.
        unsafe { std::slice::from_raw_parts_mut(self.as_ptr(), self.len) }
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        // Unguarded releases draw from their own tally, so the guard's pin is
        // still outstanding here.
        let _ = self.handle.release();
    }
}

impl fmt::Debug for PinGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinGuard")
            .field("base", &self.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}
