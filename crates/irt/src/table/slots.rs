//! Slot Storage and Growth Policy
//!
//! `slots` holds the allocated prefix of the table and grows by doubling up
//! to the ceiling. `serials` is sized to the ceiling once at creation and is
//! never reallocated, so a slot's serial survives any number of reuses and
//! any growth.

use crate::object::ObjectRef;
use std::collections::TryReserveError;

/// Contents of one table slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Never used, removed, or discarded by a segment pop
    Empty,
    /// Holds a reference
    Live(ObjectRef),
    /// Weak referent cleared by the collector; still occupies the slot
    Cleared,
}

impl Slot {
    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        matches!(self, Slot::Empty)
    }
}

/// Why the backing array could not grow
#[derive(Debug)]
pub(crate) enum GrowError {
    /// Already at `max_capacity`
    AtCeiling,
    /// Allocator refused the reservation
    Alloc { requested: usize, source: TryReserveError },
}

pub(crate) struct SlotTable {
    slots: Vec<Slot>,
    serials: Box<[u32]>,
    max_capacity: usize,
}

impl SlotTable {
    /// Allocate `initial` slots and `max` serials
    pub(crate) fn new(initial: usize, max: usize) -> Result<Self, GrowError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(initial)
            .map_err(|source| GrowError::Alloc {
                requested: initial,
                source,
            })?;
        slots.resize(initial, Slot::Empty);

        let mut serials = Vec::new();
        serials
            .try_reserve_exact(max)
            .map_err(|source| GrowError::Alloc {
                requested: max,
                source,
            })?;
        serials.resize(max, 0u32);

        Ok(Self {
            slots,
            serials: serials.into_boxed_slice(),
            max_capacity: max,
        })
    }

    /// Allocated slots
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Slot {
        self.slots[index]
    }

    #[inline]
    pub(crate) fn serial(&self, index: usize) -> u32 {
        self.serials[index]
    }

    /// Store `obj` at `index`, bumping the slot serial. Returns the new serial.
    #[inline]
    pub(crate) fn store(&mut self, index: usize, obj: ObjectRef) -> u32 {
        let serial = self.serials[index].wrapping_add(1);
        self.serials[index] = serial;
        self.slots[index] = Slot::Live(obj);
        serial
    }

    /// Overwrite a slot without touching its serial
    #[inline]
    pub(crate) fn set(&mut self, index: usize, slot: Slot) {
        self.slots[index] = slot;
    }

    #[inline]
    pub(crate) fn clear(&mut self, index: usize) {
        self.slots[index] = Slot::Empty;
    }

    /// Double the allocation, capped at the ceiling. Returns `(old, new)` capacity.
    pub(crate) fn grow(&mut self) -> Result<(usize, usize), GrowError> {
        let old = self.capacity();
        if old >= self.max_capacity {
            return Err(GrowError::AtCeiling);
        }
        let new = old.saturating_mul(2).min(self.max_capacity);
        self.resize_to(new)?;
        Ok((old, new))
    }

    /// Ensure at least `total` slots are allocated, growing by doubling
    pub(crate) fn reserve_total(&mut self, total: usize) -> Result<(), GrowError> {
        if total > self.max_capacity {
            return Err(GrowError::AtCeiling);
        }
        if total <= self.capacity() {
            return Ok(());
        }
        let mut new = self.capacity();
        while new < total {
            new = new.saturating_mul(2);
        }
        self.resize_to(new.min(self.max_capacity))
    }

    fn resize_to(&mut self, new: usize) -> Result<(), GrowError> {
        let additional = new - self.slots.len();
        self.slots
            .try_reserve_exact(additional)
            .map_err(|source| GrowError::Alloc {
                requested: new,
                source,
            })?;
        self.slots.resize(new, Slot::Empty);
        Ok(())
    }

    /// Slots in `[0, top)`
    #[inline]
    pub(crate) fn prefix(&self, top: usize) -> &[Slot] {
        &self.slots[..top]
    }

    #[inline]
    pub(crate) fn prefix_mut(&mut self, top: usize) -> &mut [Slot] {
        &mut self.slots[..top]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(addr: usize) -> ObjectRef {
        ObjectRef::new(addr).unwrap()
    }

    #[test]
    fn test_initial_sizes() {
        let table = SlotTable::new(2, 20).unwrap();
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.max_capacity(), 20);
        assert_eq!(table.serials.len(), 20);
    }

    #[test]
    fn test_grow_doubles_and_caps() {
        let mut table = SlotTable::new(3, 10).unwrap();
        assert_eq!(table.grow().unwrap(), (3, 6));
        assert_eq!(table.grow().unwrap(), (6, 10));
        assert!(matches!(table.grow(), Err(GrowError::AtCeiling)));
    }

    #[test]
    fn test_grow_preserves_contents_and_serials() {
        let mut table = SlotTable::new(2, 8).unwrap();
        let s0 = table.store(0, obj(0x10));
        let s1 = table.store(1, obj(0x20));
        let serials_ptr = table.serials.as_ptr();

        table.grow().unwrap();

        assert_eq!(table.get(0), Slot::Live(obj(0x10)));
        assert_eq!(table.get(1), Slot::Live(obj(0x20)));
        assert_eq!(table.get(2), Slot::Empty);
        assert_eq!(table.serial(0), s0);
        assert_eq!(table.serial(1), s1);
        assert_eq!(table.serials.as_ptr(), serials_ptr);
    }

    #[test]
    fn test_store_bumps_serial() {
        let mut table = SlotTable::new(1, 1).unwrap();
        let first = table.store(0, obj(0x10));
        table.clear(0);
        let second = table.store(0, obj(0x10));
        assert_ne!(first, second);
    }

    #[test]
    fn test_reserve_total() {
        let mut table = SlotTable::new(2, 100).unwrap();
        table.reserve_total(9).unwrap();
        assert_eq!(table.capacity(), 16);
        assert!(matches!(table.reserve_total(101), Err(GrowError::AtCeiling)));
    }
}
