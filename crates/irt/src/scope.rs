//! Local Reference Scopes
//!
//! RAII wrapper over `push_segment`/`pop_segment`. A scope pushes a segment
//! on creation and pops it when dropped, so every reference added through
//! it is released on every exit path, including unwinding.
//!
//! ```rust
//! use irt::{IndirectReferenceTable, IndirectRefKind, LocalScope, ObjectRef};
//!
//! let mut table = IndirectReferenceTable::create(16, 64, IndirectRefKind::Local)?;
//! let kept = {
//!     let mut scope = LocalScope::new(&mut table);
//!     scope.add(ObjectRef::new(0x1000).unwrap());
//!     let result = scope.add(ObjectRef::new(0x2000).unwrap());
//!     scope.pop_with_result(Some(result))
//! };
//! assert_eq!(table.entry_count(), 1);
//! assert_eq!(table.get(kept.unwrap())?, ObjectRef::new(0x2000).unwrap());
//! # Ok::<(), irt::IrtError>(())
//! ```

use crate::error::Result;
use crate::handle::IndirectRef;
use crate::object::ObjectRef;
use crate::segment::Cookie;
use crate::table::IndirectReferenceTable;

/// One segment of a local reference table, popped on drop
pub struct LocalScope<'t> {
    table: &'t mut IndirectReferenceTable,
    cookie: Cookie,
    outer: Option<Cookie>,
    popped: bool,
}

impl<'t> LocalScope<'t> {
    /// Push a segment on `table`
    pub fn new(table: &'t mut IndirectReferenceTable) -> Self {
        let cookie = table.push_segment();
        Self {
            table,
            cookie,
            outer: None,
            popped: false,
        }
    }

    /// Push a segment inside the enclosing segment that began at `outer`
    ///
    /// `pop_with_result` then re-adds its result into that segment, so the
    /// result can fill one of the enclosing segment's holes.
    pub fn within(table: &'t mut IndirectReferenceTable, outer: Cookie) -> Self {
        let cookie = table.push_segment();
        Self {
            table,
            cookie,
            outer: Some(outer),
            popped: false,
        }
    }

    /// Push a segment after reserving room for `capacity` references
    pub fn with_capacity(table: &'t mut IndirectReferenceTable, capacity: usize) -> Result<Self> {
        table.ensure_free_capacity(capacity)?;
        Ok(Self::new(table))
    }

    /// Cookie marking the bottom of this scope
    pub fn cookie(&self) -> Cookie {
        self.cookie
    }

    /// Add through the hole-reusing path
    pub fn add(&mut self, obj: ObjectRef) -> IndirectRef {
        self.table.add(self.cookie, obj)
    }

    /// Add through the fast append path
    pub fn append(&mut self, obj: ObjectRef) -> IndirectRef {
        self.table.append_fast(self.cookie, obj)
    }

    pub fn get(&self, handle: IndirectRef) -> Result<ObjectRef> {
        self.table.get(handle)
    }

    /// Remove a reference added in this scope
    pub fn remove(&mut self, handle: IndirectRef) -> bool {
        self.table.remove(self.cookie, handle)
    }

    /// Open an inner scope; this scope is unusable until it ends
    pub fn nested(&mut self) -> LocalScope<'_> {
        LocalScope::within(self.table, self.cookie)
    }

    /// Pop this scope, carrying one reference out to the enclosing segment
    ///
    /// Returns a new handle for the same object, or `None` if `result` was
    /// `None` or no longer valid. A scope opened with `new` does not know
    /// where the enclosing segment began and appends the result above every
    /// existing entry; use `nested` or `within` to let it reuse a hole.
    pub fn pop_with_result(mut self, result: Option<IndirectRef>) -> Option<IndirectRef> {
        let obj = result.and_then(|handle| self.table.get(handle).ok());
        self.pop();
        obj.map(|obj| {
            let outer = self.outer.unwrap_or_else(|| self.table.segment_state());
            self.table.add(outer, obj)
        })
    }

    fn pop(&mut self) {
        if !self.popped {
            self.table.pop_segment(self.cookie);
            self.popped = true;
        }
    }
}

impl Drop for LocalScope<'_> {
    fn drop(&mut self) {
        self.pop();
    }
}
