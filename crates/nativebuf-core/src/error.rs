//! Error types for layout and move primitives.

use thiserror::Error;

/// Failure to compute a layout for a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The type has no representable size (zero-sized, or too large for a
    /// 32-bit size count).
    #[error("unsupported type `{type_name}`: size {size} has no interop layout")]
    UnsupportedType {
        /// `std::any::type_name` of the offending type.
        type_name: &'static str,
        /// Its in-memory size in bytes.
        size: usize,
    },
}

/// Failure of a checked move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The source length exceeds the declared destination capacity.
    #[error("insufficient destination capacity: {requested} bytes into {capacity}")]
    InsufficientCapacity {
        /// Bytes the caller asked to copy.
        requested: usize,
        /// Bytes the destination can hold.
        capacity: usize,
    },
    /// A range does not lie inside the slice it indexes.
    #[error("range {start}..{start}+{len} out of bounds for {bound} bytes")]
    RangeOutOfBounds {
        /// First byte of the range.
        start: usize,
        /// Length of the range.
        len: usize,
        /// Length of the slice.
        bound: usize,
    },
}
