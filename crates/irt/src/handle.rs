//! Indirect Reference Encoding
//!
//! An indirect reference packs three fields into one 64-bit word:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────┬──────┐
//! │        Serial (46 bits)      │  Index (16 bits) │ Kind │
//! │            63-18             │       17-2       │  1-0 │
//! └──────────────────────────────┴──────────────────┴──────┘
//! ```
//!
//! - Kind: which category of table issued the handle. Zero is never issued,
//!   so an aligned direct object pointer never decodes as a valid kind.
//! - Index: slot offset in the issuing table.
//! - Serial: the slot's reuse counter at the time the handle was issued.
//!
//! Handles are only produced by the table (`pub(crate)` encoder). Callers can
//! round-trip a handle through a raw integer, but a forged value is only
//! accepted if every field matches the live slot.

use serde::Serialize;
use static_assertions::const_assert;
use std::fmt;
use std::num::NonZeroU64;

/// Number of bits holding the kind tag
pub const KIND_BITS: u32 = 2;
/// Number of bits holding the slot index
pub const INDEX_BITS: u32 = 16;
/// Number of bits holding the liveness serial
pub const SERIAL_BITS: u32 = 64 - KIND_BITS - INDEX_BITS;

pub const KIND_MASK: u64 = (1 << KIND_BITS) - 1;
pub const INDEX_SHIFT: u32 = KIND_BITS;
pub const INDEX_MASK: u64 = ((1 << INDEX_BITS) - 1) << INDEX_SHIFT;
pub const SERIAL_SHIFT: u32 = KIND_BITS + INDEX_BITS;

/// Hard ceiling on table size imposed by the index field
pub const MAX_TABLE_CAPACITY: usize = 1 << INDEX_BITS;

const_assert!(SERIAL_BITS >= u32::BITS);
const_assert!(MAX_TABLE_CAPACITY - 1 <= (INDEX_MASK >> INDEX_SHIFT) as usize);

/// Category of table that issued a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum IndirectRefKind {
    /// Per native frame references, released in bulk on frame exit
    Local = 1,
    /// Process-wide strong references
    Global = 2,
    /// Process-wide references that do not keep the referent alive
    WeakGlobal = 3,
}

impl IndirectRefKind {
    /// Decode kind bits. Returns `None` for the reserved zero tag.
    #[inline]
    pub const fn from_bits(bits: u64) -> Option<Self> {
        match bits & KIND_MASK {
            1 => Some(Self::Local),
            2 => Some(Self::Global),
            3 => Some(Self::WeakGlobal),
            _ => None,
        }
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self as u64
    }
}

impl fmt::Display for IndirectRefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndirectRefKind::Local => write!(f, "local"),
            IndirectRefKind::Global => write!(f, "global"),
            IndirectRefKind::WeakGlobal => write!(f, "weak global"),
        }
    }
}

/// Opaque handle standing in for an object pointer
///
/// `Option<IndirectRef>` has the same size as `u64`; `None` is the null reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct IndirectRef(NonZeroU64);

impl IndirectRef {
    /// Pack a handle. Only the table issues handles.
    #[inline]
    pub(crate) fn encode(kind: IndirectRefKind, index: usize, serial: u32) -> Self {
        debug_assert!(index < MAX_TABLE_CAPACITY, "index {} exceeds handle range", index);
        let raw = kind.bits()
            | (((index as u64) << INDEX_SHIFT) & INDEX_MASK)
            | ((serial as u64) << SERIAL_SHIFT);
        // Kind bits are never zero, so raw is never zero.
        match NonZeroU64::new(raw) {
            Some(raw) => Self(raw),
            None => unreachable!("encoded reference with zero kind"),
        }
    }

    /// Reinterpret a raw value received from native code
    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw value for passing to native code
    #[inline]
    pub fn raw(self) -> u64 {
        self.0.get()
    }

    /// Decoded kind, `None` if the kind bits are zero
    #[inline]
    pub fn kind(self) -> Option<IndirectRefKind> {
        IndirectRefKind::from_bits(self.raw())
    }

    /// Decoded slot index
    #[inline]
    pub fn index(self) -> usize {
        ((self.raw() & INDEX_MASK) >> INDEX_SHIFT) as usize
    }

    /// Decoded serial captured at issuance
    #[inline]
    pub fn serial(self) -> u32 {
        (self.raw() >> SERIAL_SHIFT) as u32
    }

    /// Compare the whole serial field, so forged high bits never match
    #[inline]
    pub(crate) fn has_serial(self, serial: u32) -> bool {
        self.raw() >> SERIAL_SHIFT == u64::from(serial)
    }
}

impl fmt::Debug for IndirectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(
                f,
                "IndirectRef({:#x}: {} #{} serial {})",
                self.raw(),
                kind,
                self.index(),
                self.serial()
            ),
            None => write!(f, "IndirectRef({:#x}: invalid kind)", self.raw()),
        }
    }
}

/// Kind of a raw reference, as the dispatch layer sees it before routing
pub fn reference_kind(raw: u64) -> Option<IndirectRefKind> {
    IndirectRefKind::from_bits(raw)
}
