//! Indirect Reference Table
//!
//! A growable array of object addresses handed to native code as encoded
//! handles. Entries below `top_index` are dense apart from holes left by
//! interior removals. Segments mirror native call frames: a cookie records
//! `(top_index, hole_count)` on entry and restoring it on exit discards the
//! whole frame in O(1).
//!
//! # Concurrency
//!
//! The table is not internally synchronized. Mutation takes `&mut self`, so
//! a table owned by one native call stack needs nothing further; a shared
//! table goes behind a lock (see [`crate::global::GlobalReferences`]).
//! Lookups take `&self` and never mutate slots.
//!
//! # Example
//!
//! ```rust
//! use irt::{IndirectReferenceTable, IndirectRefKind, ObjectRef};
//!
//! let mut table = IndirectReferenceTable::create(2, 20, IndirectRefKind::Local)?;
//! let cookie = table.push_segment();
//!
//! let obj = ObjectRef::new(0x1000).unwrap();
//! let handle = table.add(cookie, obj);
//! assert_eq!(table.get(handle)?, obj);
//!
//! table.pop_segment(cookie);
//! assert!(table.get(handle).is_err());
//! # Ok::<(), irt::IrtError>(())
//! ```

pub(crate) mod audit;
pub(crate) mod slots;

use crate::config::{CheckMode, FatalPolicy, IrtConfig};
use crate::dump::{DumpSource, TableDump};
use crate::error::{InvalidRefReason, IrtError, Result};
use crate::fatal;
use crate::handle::{IndirectRef, IndirectRefKind};
use crate::logging::{log_event, IrtEvent};
use crate::object::{ObjectModel, ObjectRef, OpaqueObjects};
use crate::segment::Cookie;
use crate::stats::IrtStats;
use audit::Audit;
use slots::{GrowError, Slot, SlotTable};
use std::fmt;
use std::sync::Arc;

pub struct IndirectReferenceTable {
    name: String,
    kind: IndirectRefKind,
    slots: SlotTable,
    /// One past the highest occupied slot
    top_index: usize,
    /// Empty slots strictly below `top_index`
    hole_count: usize,
    check_mode: CheckMode,
    fatal_policy: FatalPolicy,
    compat_removal: bool,
    audit: Audit,
    objects: Arc<dyn ObjectModel>,
    stats: IrtStats,
}

impl IndirectReferenceTable {
    /// Create a table with an opaque object model
    pub fn new(config: IrtConfig) -> Result<Self> {
        Self::with_object_model(config, Arc::new(OpaqueObjects))
    }

    /// Create a table with default settings for `kind`
    ///
    /// Requires `0 < initial_capacity <= max_capacity <= 65536`.
    pub fn create(initial_capacity: usize, max_capacity: usize, kind: IndirectRefKind) -> Result<Self> {
        let preset = match kind {
            IndirectRefKind::Local => IrtConfig::locals(),
            IndirectRefKind::Global => IrtConfig::globals(),
            IndirectRefKind::WeakGlobal => IrtConfig::weak_globals(),
        };
        Self::new(IrtConfig {
            initial_capacity,
            max_capacity,
            ..preset
        })
    }

    /// Create a table that consults `objects` for verification and dumps
    pub fn with_object_model(config: IrtConfig, objects: Arc<dyn ObjectModel>) -> Result<Self> {
        config.validate()?;

        let slots = SlotTable::new(config.initial_capacity, config.max_capacity).map_err(
            |err| match err {
                GrowError::Alloc { requested, source } => IrtError::AllocationFailed {
                    requested,
                    reason: source.to_string(),
                },
                GrowError::AtCeiling => IrtError::AllocationFailed {
                    requested: config.initial_capacity,
                    reason: "initial capacity above ceiling".to_string(),
                },
            },
        )?;

        log_event(IrtEvent::TableCreated {
            table: config.name.clone(),
            kind: config.kind.to_string(),
            initial_capacity: config.initial_capacity,
            max_capacity: config.max_capacity,
        });

        Ok(Self {
            name: config.name,
            kind: config.kind,
            slots,
            top_index: 0,
            hole_count: 0,
            check_mode: config.check_mode,
            fatal_policy: config.fatal_policy,
            compat_removal: config.compat_linear_scan_removal,
            audit: Audit::new(config.debug_checks),
            objects,
            stats: IrtStats::new(),
        })
    }

    /// Release the table storage
    ///
    /// Equivalent to dropping the table; entries still present are logged.
    pub fn destroy(self) {
        let live = self.live_count();
        if live > 0 {
            log::debug!(target: "irt", "'{}' destroyed with {} live entries", self.name, live);
        }
    }

    // === Queries ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IndirectRefKind {
        self.kind
    }

    /// Current top index: an upper bound on live entries, holes included
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.top_index
    }

    #[inline]
    pub fn hole_count(&self) -> usize {
        self.hole_count
    }

    /// Allocated slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.slots.max_capacity()
    }

    /// Entries that can still be appended before the ceiling
    #[inline]
    pub fn free_capacity(&self) -> usize {
        self.max_capacity() - self.top_index
    }

    /// Whether the next `add` would need to grow past the ceiling
    #[inline]
    pub fn is_full(&self) -> bool {
        self.top_index >= self.max_capacity()
    }

    pub fn stats(&self) -> &IrtStats {
        &self.stats
    }

    /// Number of non-empty slots below the top (live or cleared)
    pub fn live_count(&self) -> usize {
        self.top_index - self.hole_count
    }

    // === Segments ===

    /// Begin a segment. O(1), no allocation.
    #[inline]
    pub fn push_segment(&self) -> Cookie {
        self.stats.record_push();
        self.segment_state()
    }

    /// Current `(top_index, hole_count)` as a cookie
    #[inline]
    pub fn segment_state(&self) -> Cookie {
        Cookie::new(self.top_index, self.hole_count)
    }

    /// End the segment that began at `cookie`, discarding every slot above it
    ///
    /// A cookie above the current state, or one claiming more holes than
    /// entries, is fatal with debug checks and ignored otherwise.
    pub fn pop_segment(&mut self, cookie: Cookie) {
        self.stats.record_pop();
        if cookie.top_index() > self.top_index
            || cookie.hole_count() > self.hole_count
            || cookie.hole_count() > cookie.top_index()
        {
            let err = self.segment_misuse(cookie);
            if self.audit.enabled() {
                self.fatal(&err);
            }
            return;
        }

        let discarded = cookie.top_index()..self.top_index;
        self.audit.poison_discarded(&mut self.slots, discarded);
        self.top_index = cookie.top_index();
        self.hole_count = cookie.hole_count();
    }

    /// Bottom index and hole count of the segment that began at `cookie`
    fn segment(&self, cookie: Cookie) -> (usize, usize) {
        let bottom = cookie.top_index();
        match self.hole_count.checked_sub(cookie.hole_count()) {
            Some(holes) if bottom <= self.top_index && cookie.hole_count() <= bottom => {
                (bottom, holes)
            },
            _ => {
                let err = self.segment_misuse(cookie);
                if self.audit.enabled() {
                    self.fatal(&err);
                }
                (bottom.min(self.top_index), 0)
            },
        }
    }

    fn segment_misuse(&self, cookie: Cookie) -> IrtError {
        log::warn!(
            target: "irt",
            "'{}' segment misuse: {:?} against top {} holes {}",
            self.name,
            cookie,
            self.top_index,
            self.hole_count
        );
        log_event(IrtEvent::SegmentMisuse {
            table: self.name.clone(),
            cookie_top: cookie.top_index(),
            top_index: self.top_index,
        });
        IrtError::SegmentMisuse {
            cookie_top: cookie.top_index(),
            cookie_holes: cookie.hole_count(),
            top_index: self.top_index,
            hole_count: self.hole_count,
        }
    }

    // === Add ===

    /// Add a reference in the segment that began at `cookie`
    ///
    /// Overflow and growth failure are fatal: dropping the reference would
    /// lose a GC root.
    pub fn add(&mut self, cookie: Cookie, obj: ObjectRef) -> IndirectRef {
        match self.try_add(cookie, obj) {
            Ok(handle) => handle,
            Err(err) => self.fatal(&err),
        }
    }

    /// Add a reference, reporting overflow and allocation failure as errors
    pub fn try_add(&mut self, cookie: Cookie, obj: ObjectRef) -> Result<IndirectRef> {
        if !self.audit.verify_object(self.objects.as_ref(), obj) {
            return Err(IrtError::InvalidObject {
                address: obj.address(),
            });
        }

        let top = self.top_index;
        if top == self.slots.capacity() {
            self.grow()?;
        }

        let (bottom, holes) = self.segment(cookie);
        if holes > 0 {
            if let Some(index) = (bottom..top).rev().find(|&i| self.slots.get(i).is_empty()) {
                let serial = self.slots.store(index, obj);
                self.hole_count -= 1;
                self.audit.record_store(index, obj);
                self.stats.record_add(top, true);
                return Ok(IndirectRef::encode(self.kind, index, serial));
            }
            log::warn!(
                target: "irt",
                "'{}' expected {} holes above index {} but found none",
                self.name,
                holes,
                bottom
            );
        }

        let serial = self.slots.store(top, obj);
        self.top_index = top + 1;
        self.audit.record_store(top, obj);
        self.stats.record_add(top + 1, false);
        Ok(IndirectRef::encode(self.kind, top, serial))
    }

    /// Append at the top, ignoring holes
    ///
    /// For the native-call entry path right after `push_segment`, where the
    /// new segment has no holes yet. Falls back to `add` when the allocation
    /// is full or the object fails verification.
    #[inline]
    pub fn append_fast(&mut self, cookie: Cookie, obj: ObjectRef) -> IndirectRef {
        let top = self.top_index;
        if top == self.slots.capacity() || !self.audit.verify_object(self.objects.as_ref(), obj) {
            return self.add(cookie, obj);
        }
        let serial = self.slots.store(top, obj);
        self.top_index = top + 1;
        self.audit.record_store(top, obj);
        self.stats.record_fast_append(top + 1);
        IndirectRef::encode(self.kind, top, serial)
    }

    /// Reserve room for `count` more entries
    ///
    /// Never fatal: failure is reported to the caller.
    pub fn ensure_free_capacity(&mut self, count: usize) -> Result<()> {
        let needed = self.top_index.saturating_add(count);
        if needed > self.max_capacity() {
            return Err(IrtError::TableOverflow {
                table: self.name.clone(),
                max_capacity: self.max_capacity(),
            });
        }

        let before = self.slots.capacity();
        self.slots.reserve_total(needed).map_err(|err| match err {
            GrowError::Alloc { requested, source } => IrtError::AllocationFailed {
                requested,
                reason: source.to_string(),
            },
            GrowError::AtCeiling => IrtError::TableOverflow {
                table: self.name.clone(),
                max_capacity: self.max_capacity(),
            },
        })?;

        if self.slots.capacity() > before {
            self.stats.record_grow();
            log_event(IrtEvent::TableGrown {
                table: self.name.clone(),
                from: before,
                to: self.slots.capacity(),
            });
        }
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        match self.slots.grow() {
            Ok((from, to)) => {
                self.stats.record_grow();
                log_event(IrtEvent::TableGrown {
                    table: self.name.clone(),
                    from,
                    to,
                });
                Ok(())
            },
            Err(GrowError::AtCeiling) => {
                log_event(IrtEvent::TableOverflow {
                    table: self.name.clone(),
                    max_capacity: self.max_capacity(),
                });
                Err(IrtError::TableOverflow {
                    table: self.name.clone(),
                    max_capacity: self.max_capacity(),
                })
            },
            Err(GrowError::Alloc { requested, source }) => Err(IrtError::AllocationFailed {
                requested,
                reason: source.to_string(),
            }),
        }
    }

    // === Lookup ===

    /// Exchange a handle for its object
    ///
    /// Invalid handles are logged and returned as `InvalidReference`; strict
    /// mode makes them fatal. A cleared weak referent is reported as
    /// `ClearedReference` and never escalated.
    pub fn get(&self, handle: IndirectRef) -> Result<ObjectRef> {
        match self.validate(handle) {
            Ok((_, Slot::Live(obj))) => Ok(obj),
            Ok((index, _)) => Err(IrtError::ClearedReference { index }),
            Err(reason) => Err(self.reject_lookup(reason, Some(handle.index()))),
        }
    }

    /// Lookup from a raw value received over FFI; zero is the null reference
    pub fn get_raw(&self, raw: u64) -> Result<ObjectRef> {
        match IndirectRef::from_raw(raw) {
            Some(handle) => self.get(handle),
            None => Err(self.reject_lookup(InvalidRefReason::Null, None)),
        }
    }

    /// Validation without logging or escalation
    pub fn is_valid_reference(&self, handle: IndirectRef) -> bool {
        self.validate(handle).is_ok()
    }

    /// Whether `handle` is valid and its weak referent has been cleared
    pub fn is_cleared(&self, handle: IndirectRef) -> bool {
        matches!(self.validate(handle), Ok((_, Slot::Cleared)))
    }

    /// Replace the object behind a live handle; the handle stays valid
    pub fn update(&mut self, handle: IndirectRef, obj: ObjectRef) -> Result<()> {
        let index = match self.validate(handle) {
            Ok((index, _)) => index,
            Err(reason) => return Err(self.reject_lookup(reason, Some(handle.index()))),
        };
        if !self.audit.verify_object(self.objects.as_ref(), obj) {
            return Err(IrtError::InvalidObject {
                address: obj.address(),
            });
        }
        self.slots.set(index, Slot::Live(obj));
        self.audit.record_store(index, obj);
        Ok(())
    }

    /// Checks, in order: kind, bounds, occupancy, serial
    fn validate(&self, handle: IndirectRef) -> std::result::Result<(usize, Slot), InvalidRefReason> {
        let actual = handle
            .kind()
            .ok_or(InvalidRefReason::UnknownKind { raw: handle.raw() })?;
        if actual != self.kind {
            return Err(InvalidRefReason::WrongKind {
                expected: self.kind,
                actual,
            });
        }

        let index = handle.index();
        if index >= self.top_index {
            return Err(InvalidRefReason::OutOfBounds {
                index,
                top_index: self.top_index,
            });
        }

        let slot = self.slots.get(index);
        if slot.is_empty() {
            return Err(InvalidRefReason::Deleted { index });
        }

        let slot_serial = self.slots.serial(index);
        if !handle.has_serial(slot_serial) {
            return Err(InvalidRefReason::Stale {
                index,
                handle_serial: handle.serial(),
                slot_serial,
            });
        }

        Ok((index, slot))
    }

    fn reject_lookup(&self, reason: InvalidRefReason, index: Option<usize>) -> IrtError {
        self.stats.record_invalid_lookup();

        let history = match (reason, index) {
            (InvalidRefReason::Deleted { .. } | InvalidRefReason::Stale { .. }, Some(index)) => {
                self.audit.describe(index)
            },
            _ => String::new(),
        };
        log::warn!(target: "irt", "'{}' invalid reference: {}{}", self.name, reason, history);
        log_event(IrtEvent::InvalidReference {
            table: self.name.clone(),
            reason: format!("{}{}", reason, history),
        });

        let err = IrtError::InvalidReference {
            table: self.name.clone(),
            reason,
        };
        if self.check_mode == CheckMode::Strict {
            self.fatal(&err);
        }
        err
    }

    // === Remove ===

    /// Remove a reference from the segment that began at `cookie`
    ///
    /// Returns false without mutating when the handle is stale, already
    /// deleted, of another kind, or belongs to an enclosing segment. That is
    /// normal for double deletes and not escalated.
    pub fn remove(&mut self, cookie: Cookie, handle: IndirectRef) -> bool {
        let (bottom, holes) = self.segment(cookie);

        let removed = match self.locate_for_removal(bottom, handle) {
            Ok(index) => {
                self.remove_at(bottom, holes, index);
                true
            },
            Err(Rejection::Kind(reason)) if self.compat_removal => {
                match self.scan_for_address(bottom, handle.raw()) {
                    Some(index) => {
                        log_event(IrtEvent::CompatRemoval {
                            table: self.name.clone(),
                            index,
                        });
                        self.remove_at(bottom, holes, index);
                        true
                    },
                    None => {
                        self.reject_removal(handle.index(), &reason.to_string());
                        false
                    },
                }
            },
            Err(rejection) => {
                self.reject_removal(handle.index(), &rejection.to_string());
                false
            },
        };

        self.stats.record_remove(removed);
        removed
    }

    fn locate_for_removal(&self, bottom: usize, handle: IndirectRef) -> std::result::Result<usize, Rejection> {
        let index = match self.validate(handle) {
            Ok((index, _)) => index,
            Err(reason @ (InvalidRefReason::UnknownKind { .. } | InvalidRefReason::WrongKind { .. })) => {
                return Err(Rejection::Kind(reason));
            },
            Err(reason) => return Err(Rejection::Invalid(reason)),
        };
        if index < bottom {
            return Err(Rejection::OuterSegment { index, bottom });
        }
        Ok(index)
    }

    /// Find a live slot in `[bottom, top)` holding the object at `address`, newest first
    fn scan_for_address(&self, bottom: usize, address: u64) -> Option<usize> {
        (bottom..self.top_index)
            .rev()
            .find(|&i| matches!(self.slots.get(i), Slot::Live(obj) if obj.address() as u64 == address))
    }

    fn remove_at(&mut self, bottom: usize, mut holes: usize, index: usize) {
        self.slots.clear(index);

        if index + 1 != self.top_index {
            self.hole_count += 1;
            return;
        }

        // Top of stack: reclaim trailing holes that belong to this segment.
        let mut top = index;
        while holes > 0 && top > bottom && self.slots.get(top - 1).is_empty() {
            top -= 1;
            holes -= 1;
            self.hole_count -= 1;
        }
        self.top_index = top;
    }

    fn reject_removal(&self, index: usize, reason: &str) {
        log::debug!(
            target: "irt",
            "'{}' removal of index {} rejected: {}",
            self.name,
            index,
            reason
        );
        log_event(IrtEvent::RejectedRemoval {
            table: self.name.clone(),
            index,
            reason: reason.to_string(),
        });
    }

    // === Diagnostics ===

    /// Summary of current occupants
    pub fn dump(&self) -> TableDump {
        TableDump::collect(DumpSource {
            table: &self.name,
            kind: self.kind,
            capacity: self.capacity(),
            max_capacity: self.max_capacity(),
            holes: self.hole_count,
            slots: self.slots.prefix(self.top_index),
            objects: self.objects.as_ref(),
        })
    }

    /// Text rendering of `dump`
    pub fn contents_summary(&self) -> String {
        self.dump().to_string()
    }

    /// Previous occupants of a slot, newest first (debug checks only)
    pub fn slot_history(&self, index: usize) -> Vec<ObjectRef> {
        self.audit.history(index)
    }

    fn fatal(&self, err: &IrtError) -> ! {
        fatal::escalate(self.fatal_policy, &self.dump(), err)
    }

    // === Collector access ===

    #[inline]
    pub(crate) fn slots_in_use(&self) -> &[Slot] {
        self.slots.prefix(self.top_index)
    }

    #[inline]
    pub(crate) fn slots_in_use_mut(&mut self) -> &mut [Slot] {
        self.slots.prefix_mut(self.top_index)
    }
}

impl fmt::Debug for IndirectReferenceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndirectReferenceTable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("top_index", &self.top_index)
            .field("hole_count", &self.hole_count)
            .field("capacity", &self.capacity())
            .field("max_capacity", &self.max_capacity())
            .finish()
    }
}

/// Why a removal was refused
enum Rejection {
    /// Kind bits missing or foreign; eligible for the address-scan fallback
    Kind(InvalidRefReason),
    Invalid(InvalidRefReason),
    OuterSegment { index: usize, bottom: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Kind(reason) | Rejection::Invalid(reason) => write!(f, "{}", reason),
            Rejection::OuterSegment { index, bottom } => write!(
                f,
                "index {} belongs to an enclosing segment (bottom {})",
                index, bottom
            ),
        }
    }
}
