//! Bounds-checked typed access to a native region.
//!
//! A [`SafeBuffer`] starts uninitialized: it owns a native allocation but
//! knows no capacity. [`SafeBuffer::initialize`] fixes the capacity exactly
//! once. Every typed access then runs the same sequence: compute the byte
//! length from the type layout, check `offset <= capacity - len` without
//! overflow, pin the region, move the bytes, unpin.
//!
//! Reads take `&self` and may run from many threads at once. Writes and
//! `initialize` take `&mut self`, so initialization always completes before
//! the buffer can be shared and typed writes never race each other.

use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;
use std::sync::Arc;

use bytemuck::Pod;
use nativebuf_core::{PointerWidth, TypeDescriptor, copy_disjoint};

use crate::config;
use crate::error::{ArgumentError, BufferError, RangeLimit};
use crate::handle::{NativeHandle, PinGuard};
use crate::metrics::{BufferMetrics, global_metrics};
use crate::native::{HeapAllocation, NativeAllocation};
use crate::state::{BufferState, HandleState};

/// Capacity value meaning "not yet initialized".
pub const UNINITIALIZED: usize = usize::MAX;

/// An owning, bounds-checked view over native memory.
pub struct SafeBuffer {
    handle: Arc<NativeHandle>,
    capacity: usize,
    width: PointerWidth,
}

impl SafeBuffer {
    /// Wrap `allocation` using the configured pointer width.
    #[must_use]
    pub fn new(allocation: impl NativeAllocation + 'static) -> Self {
        Self::with_pointer_width(allocation, config::pointer_width())
    }

    /// Wrap `allocation` with an explicit interop pointer width.
    #[must_use]
    pub fn with_pointer_width(
        allocation: impl NativeAllocation + 'static,
        width: PointerWidth,
    ) -> Self {
        Self {
            handle: Arc::new(NativeHandle::new(Box::new(allocation))),
            capacity: UNINITIALIZED,
            width,
        }
    }

    /// Allocate `num_bytes` zeroed bytes on the heap and initialize to that size.
    pub fn allocate(num_bytes: usize) -> Result<Self, BufferError> {
        let mut buffer = Self::new(HeapAllocation::zeroed(num_bytes)?);
        buffer.initialize(num_bytes as u64)?;
        Ok(buffer)
    }

    #[must_use]
    pub fn state(&self) -> BufferState {
        if self.capacity == UNINITIALIZED {
            BufferState::Uninitialized
        } else {
            BufferState::Sized
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state() == BufferState::Sized
    }

    /// Lifecycle state of the underlying native handle.
    #[must_use]
    pub fn handle_state(&self) -> HandleState {
        self.handle.state()
    }

    /// Pointer width used for strides and address-space limits.
    #[must_use]
    pub fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    /// Fix the capacity at `num_bytes`. Legal exactly once.
    pub fn initialize(&mut self, num_bytes: u64) -> Result<(), BufferError> {
        if self.capacity != UNINITIALIZED {
            return Err(BufferError::AlreadyInitialized {
                capacity: self.capacity,
            });
        }

        let address_space = self.width.max_address_space();
        if num_bytes > address_space {
            return Err(BufferError::OutOfRange {
                requested: num_bytes,
                max: address_space,
                limit: RangeLimit::AddressSpace,
            });
        }
        // The all-ones value of the narrower of the interop width and the host
        // width marks "uninitialized" and can never be a capacity.
        let sentinel = address_space.min(UNINITIALIZED as u64);
        let capacity = match usize::try_from(num_bytes) {
            Ok(capacity) if num_bytes < sentinel => capacity,
            _ => {
                return Err(BufferError::OutOfRange {
                    requested: num_bytes,
                    max: sentinel - 1,
                    limit: RangeLimit::ReservedSentinel,
                });
            }
        };
        if let Some(known) = self.handle.known_len() {
            if capacity > known {
                return Err(BufferError::OutOfRange {
                    requested: num_bytes,
                    max: known as u64,
                    limit: RangeLimit::Allocation,
                });
            }
        }
        if self.handle.state() != HandleState::Open {
            return Err(BufferError::Closed);
        }

        self.capacity = capacity;
        BufferMetrics::inc(&global_metrics().initializations);
        log::debug!(
            "nativebuf: initialized {:p} with {capacity} bytes",
            self.handle.base()
        );
        Ok(())
    }

    /// Initialize for `num_elements` elements of `size_of_each` bytes.
    pub fn initialize_elements(
        &mut self,
        num_elements: u32,
        size_of_each: u32,
    ) -> Result<(), BufferError> {
        self.initialize(u64::from(num_elements) * u64::from(size_of_each))
    }

    /// Initialize for `num_elements` array elements of `T`, using its stride.
    pub fn initialize_for<T: Pod>(&mut self, num_elements: u32) -> Result<(), BufferError> {
        let stride = TypeDescriptor::of::<T>(self.width)?.aligned_size() as u64;
        let total = u64::from(num_elements).checked_mul(stride).ok_or(
            BufferError::OutOfRange {
                requested: u64::MAX,
                max: self.width.max_address_space(),
                limit: RangeLimit::AddressSpace,
            },
        )?;
        self.initialize(total)
    }

    /// Capacity in bytes.
    pub fn byte_length(&self) -> Result<usize, BufferError> {
        self.sized_capacity()
    }

    /// Pin the region and return a guard exposing its base address.
    pub fn acquire_pointer(&self) -> Result<PinGuard, BufferError> {
        let capacity = self.sized_capacity()?;
        PinGuard::acquire(&self.handle, capacity)
    }

    /// Take a pin without a guard. Must be paired with
    /// [`SafeBuffer::dangerous_release`].
    pub fn dangerous_add_ref(&self) -> Result<NonNull<u8>, BufferError> {
        self.handle.add_ref_unguarded()?;
        Ok(self.handle.base())
    }

    /// Return a pin taken by [`SafeBuffer::dangerous_add_ref`]. Fails with
    /// [`BufferError::ReleaseUnderflow`] when none is outstanding; pins held
    /// by guards or in-flight accesses are never returned here.
    pub fn dangerous_release(&self) -> Result<(), BufferError> {
        self.handle.release_unguarded()
    }

    /// Outstanding pins.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.handle.pin_count()
    }

    /// Close the handle. Further pins fail; the native region is released
    /// once the last outstanding pin is returned.
    pub fn close(&self) {
        self.handle.close();
    }

    /// Read one `T` at `byte_offset`.
    pub fn read<T: Pod>(&self, byte_offset: usize) -> Result<T, BufferError> {
        let capacity = self.sized_capacity()?;
        let size = TypeDescriptor::of::<T>(self.width)?.size();
        self.space_check(byte_offset, size, capacity)?;

        let pin = PinGuard::acquire(&self.handle, capacity)?;
        let mut value: T = bytemuck::Zeroable::zeroed();
        let src = window(pin.bytes(), byte_offset, size)?;
        let route = copy_disjoint(bytemuck::bytes_of_mut(&mut value), src)?;

        let metrics = global_metrics();
        metrics.record_move(route, size);
        BufferMetrics::inc(&metrics.typed_reads);
        Ok(value)
    }

    /// Write `value` at `byte_offset`.
    pub fn write<T: Pod>(&mut self, byte_offset: usize, value: T) -> Result<(), BufferError> {
        let capacity = self.sized_capacity()?;
        let size = TypeDescriptor::of::<T>(self.width)?.size();
        self.space_check(byte_offset, size, capacity)?;

        let mut pin = PinGuard::acquire(&self.handle, capacity)?;
        let dest = window_mut(pin.bytes_mut(), byte_offset, size)?;
        let route = copy_disjoint(dest, bytemuck::bytes_of(&value))?;

        let metrics = global_metrics();
        metrics.record_move(route, size);
        BufferMetrics::inc(&metrics.typed_writes);
        Ok(())
    }

    /// Read `count` elements into `dest[index..index + count]`.
    pub fn read_array<T: Pod>(
        &self,
        byte_offset: usize,
        dest: &mut [T],
        index: usize,
        count: usize,
    ) -> Result<(), BufferError> {
        let range = array_range(dest.len(), index, count)?;
        self.read_span(byte_offset, &mut dest[range])
    }

    /// Write `src[index..index + count]` as consecutive elements.
    pub fn write_array<T: Pod>(
        &mut self,
        byte_offset: usize,
        src: &[T],
        index: usize,
        count: usize,
    ) -> Result<(), BufferError> {
        let range = array_range(src.len(), index, count)?;
        self.write_span(byte_offset, &src[range])
    }

    /// Fill `dest` with consecutive elements starting at `byte_offset`.
    ///
    /// Elements sit `aligned_size` bytes apart; the whole strided span must fit.
    pub fn read_span<T: Pod>(&self, byte_offset: usize, dest: &mut [T]) -> Result<(), BufferError> {
        let capacity = self.sized_capacity()?;
        let desc = TypeDescriptor::of::<T>(self.width)?;
        let total = self.span_len(byte_offset, &desc, dest.len(), capacity)?;

        let pin = PinGuard::acquire(&self.handle, capacity)?;
        let region = window(pin.bytes(), byte_offset, total)?;
        let metrics = global_metrics();
        if desc.is_padded() {
            let stride = desc.aligned_size();
            for (i, slot) in dest.iter_mut().enumerate() {
                let src = window(region, i * stride, desc.size())?;
                let route = copy_disjoint(bytemuck::bytes_of_mut(slot), src)?;
                metrics.record_move(route, desc.size());
            }
        } else {
            let route = copy_disjoint(bytemuck::cast_slice_mut(dest), region)?;
            metrics.record_move(route, total);
        }
        BufferMetrics::inc(&metrics.array_reads);
        Ok(())
    }

    /// Store `src` as consecutive elements starting at `byte_offset`.
    pub fn write_span<T: Pod>(&mut self, byte_offset: usize, src: &[T]) -> Result<(), BufferError> {
        let capacity = self.sized_capacity()?;
        let desc = TypeDescriptor::of::<T>(self.width)?;
        let total = self.span_len(byte_offset, &desc, src.len(), capacity)?;

        let mut pin = PinGuard::acquire(&self.handle, capacity)?;
        let region = window_mut(pin.bytes_mut(), byte_offset, total)?;
        let metrics = global_metrics();
        if desc.is_padded() {
            let stride = desc.aligned_size();
            for (i, value) in src.iter().enumerate() {
                let dest = window_mut(region, i * stride, desc.size())?;
                let route = copy_disjoint(dest, bytemuck::bytes_of(value))?;
                metrics.record_move(route, desc.size());
            }
        } else {
            let route = copy_disjoint(region, bytemuck::cast_slice(src))?;
            metrics.record_move(route, total);
        }
        BufferMetrics::inc(&metrics.array_writes);
        Ok(())
    }

    fn sized_capacity(&self) -> Result<usize, BufferError> {
        if self.capacity == UNINITIALIZED {
            Err(BufferError::NotInitialized)
        } else {
            Ok(self.capacity)
        }
    }

    fn space_check(&self, offset: usize, len: usize, capacity: usize) -> Result<(), BufferError> {
        if capacity < len || offset > capacity - len {
            BufferMetrics::inc(&global_metrics().bounds_rejections);
            return Err(BufferError::BufferTooSmall {
                offset,
                len,
                capacity,
            });
        }
        Ok(())
    }

    /// Bytes covered by `count` strided elements at `offset`, bounds-checked.
    fn span_len(
        &self,
        offset: usize,
        desc: &TypeDescriptor,
        count: usize,
        capacity: usize,
    ) -> Result<usize, BufferError> {
        let total = desc.aligned_size().checked_mul(count).unwrap_or(usize::MAX);
        self.space_check(offset, total, capacity)?;
        Ok(total)
    }
}

impl Drop for SafeBuffer {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl fmt::Debug for SafeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeBuffer")
            .field("handle", &self.handle)
            .field("capacity", &self.sized_capacity().ok())
            .field("width", &self.width)
            .finish()
    }
}

fn array_range(len: usize, index: usize, count: usize) -> Result<Range<usize>, ArgumentError> {
    if index > len {
        return Err(ArgumentError::IndexOutOfRange { index, len });
    }
    if len - index < count {
        return Err(ArgumentError::InvalidOffsetLength { index, count, len });
    }
    Ok(index..index + count)
}

fn window(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], BufferError> {
    let capacity = bytes.len();
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(BufferError::BufferTooSmall {
            offset,
            len,
            capacity,
        })
}

fn window_mut(bytes: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8], BufferError> {
    let capacity = bytes.len();
    offset
        .checked_add(len)
        .and_then(|end| bytes.get_mut(offset..end))
        .ok_or(BufferError::BufferTooSmall {
            offset,
            len,
            capacity,
        })
}
