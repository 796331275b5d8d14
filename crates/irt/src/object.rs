//! Object Model Boundary
//!
//! The table never allocates, frees or mutates managed objects. It stores
//! their addresses and asks the owning object system two read-only questions:
//! is this address a plausible object (debug checks on add), and what is its
//! type and size (diagnostic dump).

use std::fmt;
use std::num::NonZeroUsize;

/// Address of a managed object owned by the heap
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectRef(NonZeroUsize);

impl ObjectRef {
    /// Wrap an object address. Returns `None` for null.
    #[inline]
    pub fn new(address: usize) -> Option<Self> {
        NonZeroUsize::new(address).map(Self)
    }

    /// Wrap a pointer to a managed object
    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Option<Self> {
        Self::new(ptr as usize)
    }

    #[inline]
    pub fn address(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef(0x{:016X})", self.address())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.address())
    }
}

/// Queries the table needs from the object system
///
/// Implementations must be cheap and side-effect free; `is_valid` runs on
/// every add when debug checks are on.
pub trait ObjectModel: Send + Sync {
    /// Whether `obj` looks like a live managed object
    fn is_valid(&self, obj: ObjectRef) -> bool {
        let _ = obj;
        true
    }

    /// Heap size of `obj` in bytes
    fn size_of(&self, obj: ObjectRef) -> usize;

    /// Human-readable type descriptor of `obj`
    fn type_name(&self, obj: ObjectRef) -> String;
}

/// Object model for embedders that cannot describe their objects
///
/// Accepts every non-null address and reports a single anonymous type.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueObjects;

impl ObjectModel for OpaqueObjects {
    fn size_of(&self, _obj: ObjectRef) -> usize {
        0
    }

    fn type_name(&self, _obj: ObjectRef) -> String {
        "object".to_string()
    }
}
