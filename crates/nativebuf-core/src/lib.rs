//! # nativebuf-core
//!
//! Layout and byte-movement primitives underneath `nativebuf::SafeBuffer`.
//!
//! - [`layout`]: size and array stride of blittable (`bytemuck::Pod`) types
//!   for a given pointer width.
//! - [`mover`]: the size-class dispatched, overlap-safe block move over
//!   checked slice views.
//! - [`raw`]: the same move over raw addresses, for callers that only hold
//!   native pointers.
//!
//! Only the `raw` module is allowed to use `unsafe`.

#![deny(unsafe_code)]

pub mod error;
pub mod layout;
pub mod mover;
#[allow(unsafe_code)]
pub mod raw;

pub use error::{LayoutError, MoveError};
pub use layout::{PointerWidth, TypeDescriptor, align_up, aligned_size_of, size_of};
pub use mover::{
    CopyRange, MoveRoute, SizeClass, copy_disjoint, memory_copy_checked, move_within,
};
