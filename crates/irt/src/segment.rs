//! Segment Cookies
//!
//! A cookie is a snapshot of `(top_index, hole_count)` taken when a segment
//! begins. It marks the bottom boundary for removals in that segment and the
//! baseline for its hole accounting. Cookies are packed into one word so the
//! dispatch layer can keep them in a native frame.

use std::fmt;

/// Packed segment state: top index in the high half, hole count in the low half
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Cookie(u64);

impl Cookie {
    /// State of an empty table; the bottom segment of every table
    pub const FIRST: Cookie = Cookie(0);

    #[inline]
    pub(crate) fn new(top_index: usize, hole_count: usize) -> Self {
        debug_assert!(top_index <= u32::MAX as usize && hole_count <= top_index);
        Self(((top_index as u64) << 32) | hole_count as u64)
    }

    /// Index one past the highest occupied slot when the segment began
    #[inline]
    pub fn top_index(self) -> usize {
        (self.0 >> 32) as usize
    }

    /// Holes below `top_index` when the segment began
    #[inline]
    pub fn hole_count(self) -> usize {
        (self.0 & u32::MAX as u64) as usize
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cookie(top={}, holes={})",
            self.top_index(),
            self.hole_count()
        )
    }
}
