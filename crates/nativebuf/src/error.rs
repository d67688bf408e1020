//! Buffer error taxonomy.

use nativebuf_core::{LayoutError, MoveError};
use thiserror::Error;

/// Which limit an `initialize` request exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeLimit {
    /// Larger than the configured pointer width can address.
    AddressSpace,
    /// Equal to or above the reserved "uninitialized" capacity value.
    ReservedSentinel,
    /// Larger than the native allocation is known to be.
    Allocation,
}

/// Invalid index/count arguments to an array operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// `index` is past the end of the caller's slice.
    #[error("index {index} out of range for slice of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// `count` elements starting at `index` do not fit the caller's slice.
    #[error("{count} elements at index {index} exceed slice of length {len}")]
    InvalidOffsetLength {
        index: usize,
        count: usize,
        len: usize,
    },
}

/// Errors returned by [`crate::SafeBuffer`] and its handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("buffer used before initialize")]
    NotInitialized,
    #[error("buffer already initialized with {capacity} bytes")]
    AlreadyInitialized { capacity: usize },
    #[error("requested capacity {requested} exceeds {limit:?} limit {max}")]
    OutOfRange {
        requested: u64,
        max: u64,
        limit: RangeLimit,
    },
    #[error("access of {len} bytes at offset {offset} exceeds capacity {capacity}")]
    BufferTooSmall {
        offset: usize,
        len: usize,
        capacity: usize,
    },
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error("unsupported type `{type_name}` (size {size})")]
    UnsupportedType {
        type_name: &'static str,
        size: usize,
    },
    #[error("insufficient capacity: {requested} bytes into {capacity}")]
    InsufficientCapacity { requested: usize, capacity: usize },
    #[error("native handle is closed")]
    Closed,
    #[error("pointer released more times than acquired")]
    ReleaseUnderflow,
    #[error("native allocation of {size} bytes failed")]
    AllocationFailed { size: usize },
}

impl From<LayoutError> for BufferError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::UnsupportedType { type_name, size } => {
                Self::UnsupportedType { type_name, size }
            }
        }
    }
}

impl From<MoveError> for BufferError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::InsufficientCapacity {
                requested,
                capacity,
            } => Self::InsufficientCapacity {
                requested,
                capacity,
            },
            MoveError::RangeOutOfBounds { start, len, bound } => Self::BufferTooSmall {
                offset: start,
                len,
                capacity: bound,
            },
        }
    }
}
