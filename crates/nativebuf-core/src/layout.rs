//! Size and array stride of blittable types.
//!
//! A type is blittable when its bytes can be copied to and from native memory
//! unchanged; here that is `bytemuck::Pod`. The raw size is whatever the
//! compiler lays out. The aligned size is the per-element stride used for
//! packed arrays handed across an interop boundary: 1- and 2-byte types are
//! never padded, 4-byte types are not padded at 64-bit pointer width, and every
//! other size rounds up to a multiple of the pointer width.

use bytemuck::Pod;

use crate::error::LayoutError;

/// Largest size a layout may report; sizes are 32-bit counts on the wire.
const MAX_LAYOUT_SIZE: usize = u32::MAX as usize;

/// Width of a native pointer, the single knob behind 32/64-bit layout rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    /// 4-byte pointers.
    Bits32,
    /// 8-byte pointers.
    Bits64,
}

impl PointerWidth {
    /// Pointer width of the compilation target.
    pub const NATIVE: Self = if usize::BITS == 32 {
        Self::Bits32
    } else {
        Self::Bits64
    };

    /// Pointer size in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    /// Largest byte count addressable at this width.
    #[must_use]
    pub const fn max_address_space(self) -> u64 {
        match self {
            Self::Bits32 => u32::MAX as u64,
            Self::Bits64 => u64::MAX,
        }
    }

    /// Parse from string (case-insensitive). Returns `None` for anything that
    /// does not name a width.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "32" | "4" | "x86" | "ilp32" => Some(Self::Bits32),
            "64" | "8" | "x64" | "lp64" => Some(Self::Bits64),
            "native" => Some(Self::NATIVE),
            _ => None,
        }
    }

    /// Array stride for an element of `size` bytes, or `None` if rounding
    /// overflows.
    #[must_use]
    pub const fn aligned_size(self, size: usize) -> Option<usize> {
        match (size, self) {
            (1 | 2, _) | (4, Self::Bits64) => Some(size),
            _ => align_up(size, self.bytes()),
        }
    }
}

impl Default for PointerWidth {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// Rounds `n` up to the next multiple of `alignment`.
///
/// `alignment` must be a non-zero power of two. Returns `None` on overflow.
///
/// ```
/// use nativebuf_core::align_up;
///
/// assert_eq!(align_up(0, 8), Some(0));
/// assert_eq!(align_up(3, 8), Some(8));
/// assert_eq!(align_up(8, 8), Some(8));
/// assert_eq!(align_up(12, 4), Some(12));
/// assert_eq!(align_up(usize::MAX, 8), None);
/// ```
#[inline]
#[must_use]
pub const fn align_up(n: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    match n.checked_add(alignment - 1) {
        Some(bumped) => Some(bumped & !(alignment - 1)),
        None => None,
    }
}

/// Layout facts for one blittable type at one pointer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: &'static str,
    size: usize,
    aligned_size: usize,
}

impl TypeDescriptor {
    /// Describe `T` at the given pointer width.
    pub fn of<T: Pod>(width: PointerWidth) -> Result<Self, LayoutError> {
        Self::from_size(std::any::type_name::<T>(), std::mem::size_of::<T>(), width)
    }

    /// Describe a type known only by name and size.
    pub fn from_size(
        name: &'static str,
        size: usize,
        width: PointerWidth,
    ) -> Result<Self, LayoutError> {
        let unsupported = LayoutError::UnsupportedType {
            type_name: name,
            size,
        };
        if size == 0 || size > MAX_LAYOUT_SIZE {
            return Err(unsupported);
        }
        let aligned_size = width.aligned_size(size).ok_or(unsupported)?;
        Ok(Self {
            name,
            size,
            aligned_size,
        })
    }

    /// Type name the descriptor was built for.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Exact in-memory size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Per-element stride in packed arrays.
    #[must_use]
    pub const fn aligned_size(&self) -> usize {
        self.aligned_size
    }

    /// True when array elements carry trailing padding.
    #[must_use]
    pub const fn is_padded(&self) -> bool {
        self.aligned_size != self.size
    }
}

/// In-memory size of `T`.
pub fn size_of<T: Pod>() -> Result<usize, LayoutError> {
    TypeDescriptor::of::<T>(PointerWidth::NATIVE).map(|desc| desc.size())
}

/// Array stride of `T` at `width`.
pub fn aligned_size_of<T: Pod>(width: PointerWidth) -> Result<usize, LayoutError> {
    TypeDescriptor::of::<T>(width).map(|desc| desc.aligned_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_are_never_padded() {
        for width in [PointerWidth::Bits32, PointerWidth::Bits64] {
            assert_eq!(aligned_size_of::<u8>(width), Ok(1));
            assert_eq!(aligned_size_of::<i16>(width), Ok(2));
            assert_eq!(aligned_size_of::<[u8; 2]>(width), Ok(2));
        }
    }

    #[test]
    fn four_byte_types_follow_width() {
        assert_eq!(aligned_size_of::<u32>(PointerWidth::Bits64), Ok(4));
        assert_eq!(aligned_size_of::<f32>(PointerWidth::Bits32), Ok(4));
    }

    #[test]
    fn odd_sizes_round_to_pointer_width() {
        assert_eq!(aligned_size_of::<[u8; 3]>(PointerWidth::Bits64), Ok(8));
        assert_eq!(aligned_size_of::<[u8; 3]>(PointerWidth::Bits32), Ok(4));
        assert_eq!(aligned_size_of::<[u8; 12]>(PointerWidth::Bits64), Ok(16));
        assert_eq!(aligned_size_of::<[u8; 12]>(PointerWidth::Bits32), Ok(12));
        assert_eq!(aligned_size_of::<u64>(PointerWidth::Bits32), Ok(8));
        assert_eq!(aligned_size_of::<u128>(PointerWidth::Bits64), Ok(16));
    }

    #[test]
    fn size_of_matches_compiler_layout() {
        assert_eq!(size_of::<u64>(), Ok(8));
        assert_eq!(size_of::<[u16; 5]>(), Ok(10));
    }

    #[test]
    fn zero_sized_types_are_unsupported() {
        let err = size_of::<()>().unwrap_err();
        assert!(matches!(err, LayoutError::UnsupportedType { size: 0, .. }));
        assert!(aligned_size_of::<[u32; 0]>(PointerWidth::Bits64).is_err());
    }

    #[test]
    fn oversized_runtime_descriptor_is_unsupported() {
        let err = TypeDescriptor::from_size("huge", usize::MAX, PointerWidth::Bits64);
        assert!(err.is_err());
    }

    #[test]
    fn descriptor_reports_padding() {
        let desc = TypeDescriptor::of::<[u8; 6]>(PointerWidth::Bits64).unwrap();
        assert_eq!(desc.size(), 6);
        assert_eq!(desc.aligned_size(), 8);
        assert!(desc.is_padded());
        assert!(desc.name().contains("u8"));
    }

    #[test]
    fn parse_widths_loosely() {
        assert_eq!(PointerWidth::from_str_loose("32"), Some(PointerWidth::Bits32));
        assert_eq!(PointerWidth::from_str_loose("X86"), Some(PointerWidth::Bits32));
        assert_eq!(PointerWidth::from_str_loose(" 64 "), Some(PointerWidth::Bits64));
        assert_eq!(PointerWidth::from_str_loose("lp64"), Some(PointerWidth::Bits64));
        assert_eq!(PointerWidth::from_str_loose("native"), Some(PointerWidth::NATIVE));
        assert_eq!(PointerWidth::from_str_loose("bogus"), None);
    }

    #[test]
    fn address_space_limits() {
        assert_eq!(PointerWidth::Bits32.max_address_space(), 4_294_967_295);
        assert_eq!(PointerWidth::Bits64.max_address_space(), u64::MAX);
    }
}
