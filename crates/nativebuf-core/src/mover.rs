//! Overlap-safe block moves: memmove and checked memcpy over byte slices.
//!
//! A move is routed in two steps. First the overlap test: when the source and
//! destination ranges are at least `len` bytes apart (disjoint or exactly
//! adjacent) the order of writes cannot corrupt the source, so the move takes
//! the blocked fast path. Otherwise it falls back to the platform memmove.
//!
//! The fast path dispatches on length alone. Every size class copies a head
//! block and a tail block ending exactly at the destination end, so short
//! moves take two or three fixed-width copies and no loop. Head and tail may
//! cover some bytes twice; that is harmless because both copies read the same
//! untouched source bytes. Lengths above 64 run a 64-byte block loop first.

use crate::error::MoveError;

/// Lengths above this run the 64-byte block loop.
pub const BLOCK_LOOP_THRESHOLD: usize = 64;

/// Lengths above this are classified as large transfers.
pub const LARGE_MOVE_THRESHOLD: usize = 2048;

/// Path a move took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveRoute {
    /// Zero-length move; nothing was touched.
    Empty,
    /// Ranges do not corrupt each other; size-class dispatch was used.
    Blocked,
    /// Ranges overlap; the platform memmove was used.
    Fallback,
}

/// Length bucket selecting the fast-path copy sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    /// `len == 0`.
    Empty,
    /// `1..4`: a byte, plus a trailing 2-byte word when bit 1 is set.
    Tiny,
    /// `4..8`: head and tail 4-byte words.
    Word,
    /// `8..=16`: head and tail 8-byte words.
    DoubleWord,
    /// `17..=64`: up to three 16-byte head blocks and a 16-byte tail.
    Medium,
    /// `65..=2048`: 64-byte block loop, then the medium rule on the rest.
    Blocked,
    /// `> 2048`: same loop as [`SizeClass::Blocked`].
    Large,
}

impl SizeClass {
    /// Bucket for a transfer of `len` bytes.
    #[must_use]
    pub const fn of(len: usize) -> Self {
        if len > LARGE_MOVE_THRESHOLD {
            Self::Large
        } else if len > BLOCK_LOOP_THRESHOLD {
            Self::Blocked
        } else if len > 16 {
            Self::Medium
        } else if len & 0x18 != 0 {
            Self::DoubleWord
        } else if len & 0x4 != 0 {
            Self::Word
        } else if len != 0 {
            Self::Tiny
        } else {
            Self::Empty
        }
    }
}

/// One transfer request: `len` bytes from offset `src` to offset `dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRange {
    /// Source offset.
    pub src: usize,
    /// Destination offset.
    pub dest: usize,
    /// Bytes to move.
    pub len: usize,
}

impl CopyRange {
    #[must_use]
    pub const fn new(src: usize, dest: usize, len: usize) -> Self {
        Self { src, dest, len }
    }

    /// True when a front-to-back copy cannot clobber unread source bytes.
    ///
    /// Exactly adjacent ranges (`|dest - src| == len`) count as disjoint.
    #[must_use]
    pub const fn is_disjoint(self) -> bool {
        self.dest.abs_diff(self.src) >= self.len
    }

    /// Fast-path bucket for this transfer's length.
    #[must_use]
    pub const fn size_class(self) -> SizeClass {
        SizeClass::of(self.len)
    }

    /// Route this transfer would take.
    #[must_use]
    pub const fn route(self) -> MoveRoute {
        if self.len == 0 {
            MoveRoute::Empty
        } else if self.is_disjoint() {
            MoveRoute::Blocked
        } else {
            MoveRoute::Fallback
        }
    }

    fn check_within(self, bound: usize) -> Result<(), MoveError> {
        check_range(self.src, self.len, bound)?;
        check_range(self.dest, self.len, bound)
    }
}

fn check_range(start: usize, len: usize, bound: usize) -> Result<(), MoveError> {
    match start.checked_add(len) {
        Some(end) if end <= bound => Ok(()),
        _ => Err(MoveError::RangeOutOfBounds { start, len, bound }),
    }
}

/// Moves `range.len` bytes inside one arena, from `range.src` to `range.dest`.
///
/// Both ranges may overlap in either direction; the result always equals a
/// copy through a temporary buffer.
pub fn move_within(arena: &mut [u8], range: CopyRange) -> Result<MoveRoute, MoveError> {
    range.check_within(arena.len())?;
    let route = range.route();
    match route {
        MoveRoute::Empty => {}
        MoveRoute::Blocked => {
            blocked_copy(
                &mut Within {
                    arena,
                    src: range.src,
                    dest: range.dest,
                },
                range.len,
            );
        }
        MoveRoute::Fallback => {
            arena.copy_within(range.src..range.src + range.len, range.dest);
        }
    }
    Ok(route)
}

/// Copies all of `src` into the front of `dest`.
///
/// Distinct slices never alias, so this always takes the blocked path.
pub fn copy_disjoint(dest: &mut [u8], src: &[u8]) -> Result<MoveRoute, MoveError> {
    let len = src.len();
    if len > dest.len() {
        return Err(MoveError::InsufficientCapacity {
            requested: len,
            capacity: dest.len(),
        });
    }
    if len == 0 {
        return Ok(MoveRoute::Empty);
    }
    blocked_copy(&mut Disjoint { dest, src }, len);
    Ok(MoveRoute::Blocked)
}

/// Copies `src_len` bytes of `src` into `dest`, refusing when they would not
/// fit in `dest_capacity`.
///
/// `dest_capacity` is the caller's declared room in `dest`; it must itself lie
/// within the slice.
pub fn memory_copy_checked(
    src: &[u8],
    dest: &mut [u8],
    dest_capacity: usize,
    src_len: usize,
) -> Result<MoveRoute, MoveError> {
    if src_len > dest_capacity {
        return Err(MoveError::InsufficientCapacity {
            requested: src_len,
            capacity: dest_capacity,
        });
    }
    check_range(0, dest_capacity, dest.len())?;
    check_range(0, src_len, src.len())?;
    copy_disjoint(&mut dest[..dest_capacity], &src[..src_len])
}

/// Fixed-width copy at an offset relative to the start of both ranges.
pub(crate) trait BlockCopy {
    fn copy<const N: usize>(&mut self, offset: usize);
}

/// Source and destination in separate slices.
pub(crate) struct Disjoint<'a> {
    pub(crate) dest: &'a mut [u8],
    pub(crate) src: &'a [u8],
}

impl BlockCopy for Disjoint<'_> {
    #[inline(always)]
    fn copy<const N: usize>(&mut self, offset: usize) {
        let block = load::<N>(self.src, offset);
        self.dest[offset..offset + N].copy_from_slice(&block);
    }
}

/// Source and destination ranges inside one arena, known not to corrupt
/// each other.
struct Within<'a> {
    arena: &'a mut [u8],
    src: usize,
    dest: usize,
}

impl BlockCopy for Within<'_> {
    #[inline(always)]
    fn copy<const N: usize>(&mut self, offset: usize) {
        let block = load::<N>(self.arena, self.src + offset);
        let at = self.dest + offset;
        self.arena[at..at + N].copy_from_slice(&block);
    }
}

#[inline(always)]
fn load<const N: usize>(src: &[u8], at: usize) -> [u8; N] {
    let mut block = [0_u8; N];
    block.copy_from_slice(&src[at..at + N]);
    block
}

/// Size-class dispatched copy of `len` bytes. Callers guarantee the ranges
/// are disjoint or adjacent.
#[inline]
pub(crate) fn blocked_copy<C: BlockCopy>(c: &mut C, len: usize) -> SizeClass {
    let class = SizeClass::of(len);
    match class {
        SizeClass::Empty => {}
        SizeClass::Tiny => {
            c.copy::<1>(0);
            if len & 0x2 != 0 {
                c.copy::<2>(len - 2);
            }
        }
        SizeClass::Word => {
            c.copy::<4>(0);
            c.copy::<4>(len - 4);
        }
        SizeClass::DoubleWord => {
            c.copy::<8>(0);
            c.copy::<8>(len - 8);
        }
        SizeClass::Medium => copy_medium(c, 0, len),
        SizeClass::Blocked | SizeClass::Large => {
            let mut offset = 0;
            while len - offset >= BLOCK_LOOP_THRESHOLD {
                c.copy::<64>(offset);
                offset += 64;
            }
            match len - offset {
                0 => {}
                // len > 64, so a 16-byte tail always fits.
                1..=16 => c.copy::<16>(len - 16),
                _ => copy_medium(c, offset, len),
            }
        }
    }
    class
}

/// 16-byte blocks over `offset..len`, where `16 < len - offset <= 64`.
#[inline(always)]
fn copy_medium<C: BlockCopy>(c: &mut C, offset: usize, len: usize) {
    let remaining = len - offset;
    c.copy::<16>(offset);
    if remaining > 32 {
        c.copy::<16>(offset + 16);
    }
    if remaining > 48 {
        c.copy::<16>(offset + 32);
    }
    c.copy::<16>(len - 16);
}
