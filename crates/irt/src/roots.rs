//! Root Scanning - Collector Access to Table Entries
//!
//! The collector sees the dense prefix `[0, top_index)` of a table. Holes and
//! cleared weak slots are skipped.
//!
//! # Operations
//!
//! 1. **Scan** - iterate live entries as roots (`roots`)
//! 2. **Relocate** - rewrite entries after objects move (`update_roots`)
//! 3. **Sweep** - clear or forward weak referents (`sweep`)
//!
//! The iterator borrows the table, so it cannot be held across a call that
//! grows the slot array.

use crate::error::{IrtError, Result};
use crate::handle::IndirectRefKind;
use crate::logging::{log_event, IrtEvent};
use crate::object::ObjectRef;
use crate::table::slots::Slot;
use crate::table::IndirectReferenceTable;
use serde::Serialize;
use std::iter::Enumerate;
use std::slice::Iter;

/// One live table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootEntry {
    /// Slot index
    pub index: usize,
    /// Object held by the slot
    pub object: ObjectRef,
}

/// Iterator over live entries of a table, lowest index first
pub struct Roots<'a> {
    slots: Enumerate<Iter<'a, Slot>>,
}

impl<'a> Iterator for Roots<'a> {
    type Item = RootEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().find_map(|(index, slot)| match *slot {
            Slot::Live(object) => Some(RootEntry { index, object }),
            _ => None,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.slots.size_hint().1)
    }
}

/// Outcome of a weak sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Referents still alive, possibly at a new address
    pub retained: usize,
    /// Referents that moved
    pub updated: usize,
    /// Referents found dead and cleared
    pub cleared: usize,
}

impl IndirectReferenceTable {
    /// Live entries in `[0, top_index)`
    pub fn roots(&self) -> Roots<'_> {
        Roots {
            slots: self.slots_in_use().iter().enumerate(),
        }
    }

    /// Rewrite every live entry through `forward`
    ///
    /// Serials are untouched, so outstanding handles stay valid. Returns the
    /// number of entries whose address changed.
    pub fn update_roots<F>(&mut self, mut forward: F) -> usize
    where
        F: FnMut(ObjectRef) -> ObjectRef,
    {
        let mut moved = 0;
        for slot in self.slots_in_use_mut() {
            if let Slot::Live(old) = *slot {
                let new = forward(old);
                if new != old {
                    *slot = Slot::Live(new);
                    moved += 1;
                }
            }
        }
        if moved > 0 {
            log::debug!(target: "irt", "'{}' relocated {} roots", self.name(), moved);
        }
        moved
    }

    /// Process weak referents after marking
    ///
    /// `is_alive` returns the (possibly forwarded) referent, or `None` if it
    /// died. Dead referents become cleared slots: `get` on their handles
    /// reports `ClearedReference` until the handle is removed.
    ///
    /// Only weak global tables can be swept.
    pub fn sweep<F>(&mut self, mut is_alive: F) -> Result<SweepStats>
    where
        F: FnMut(ObjectRef) -> Option<ObjectRef>,
    {
        if self.kind() != IndirectRefKind::WeakGlobal {
            return Err(IrtError::InvalidArgument(format!(
                "cannot sweep {} table '{}'",
                self.kind(),
                self.name()
            )));
        }

        let mut stats = SweepStats::default();
        for slot in self.slots_in_use_mut() {
            if let Slot::Live(old) = *slot {
                match is_alive(old) {
                    Some(new) => {
                        stats.retained += 1;
                        if new != old {
                            *slot = Slot::Live(new);
                            stats.updated += 1;
                        }
                    },
                    None => {
                        *slot = Slot::Cleared;
                        stats.cleared += 1;
                    },
                }
            }
        }

        log_event(IrtEvent::WeakSweep {
            table: self.name().to_string(),
            updated: stats.updated,
            cleared: stats.cleared,
        });
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FatalPolicy, IrtConfig};

    fn obj(addr: usize) -> ObjectRef {
        ObjectRef::new(addr).unwrap()
    }

    fn weak_table() -> IndirectReferenceTable {
        IndirectReferenceTable::new(IrtConfig {
            initial_capacity: 8,
            max_capacity: 8,
            fatal_policy: FatalPolicy::Panic,
            ..IrtConfig::weak_globals()
        })
        .unwrap()
    }

    #[test]
    fn test_roots_skip_holes() {
        let mut table = IndirectReferenceTable::create(4, 4, IndirectRefKind::Local).unwrap();
        let cookie = table.push_segment();
        let a = table.add(cookie, obj(0x10));
        table.add(cookie, obj(0x20));
        table.add(cookie, obj(0x30));
        table.remove(cookie, a);

        let roots: Vec<_> = table.roots().collect();
        assert_eq!(
            roots,
            vec![
                RootEntry { index: 1, object: obj(0x20) },
                RootEntry { index: 2, object: obj(0x30) },
            ]
        );
    }

    #[test]
    fn test_update_roots_keeps_handles_valid() {
        let mut table = IndirectReferenceTable::create(4, 4, IndirectRefKind::Local).unwrap();
        let cookie = table.push_segment();
        let a = table.add(cookie, obj(0x10));
        let b = table.add(cookie, obj(0x20));

        let moved = table.update_roots(|o| {
            if o == obj(0x10) {
                obj(0x1010)
            } else {
                o
            }
        });

        assert_eq!(moved, 1);
        assert_eq!(table.get(a).unwrap(), obj(0x1010));
        assert_eq!(table.get(b).unwrap(), obj(0x20));
    }

    #[test]
    fn test_sweep_clears_dead_referents() {
        let mut table = weak_table();
        let cookie = table.push_segment();
        let live = table.add(cookie, obj(0x10));
        let dead = table.add(cookie, obj(0x20));

        let stats = table.sweep(|o| (o != obj(0x20)).then_some(o)).unwrap();
        assert_eq!(stats, SweepStats { retained: 1, updated: 0, cleared: 1 });

        assert!(table.is_cleared(dead));
        assert!(matches!(table.get(dead), Err(IrtError::ClearedReference { index: 1 })));
        assert_eq!(table.get(live).unwrap(), obj(0x10));
        assert_eq!(table.roots().count(), 1);

        assert!(table.remove(cookie, dead));
        assert_eq!(table.entry_count(), 1);
    }

    #[test]
    fn test_sweep_rejects_strong_tables() {
        let mut table = IndirectReferenceTable::create(4, 4, IndirectRefKind::Global).unwrap();
        assert!(matches!(table.sweep(Some), Err(IrtError::InvalidArgument(_))));
    }
}
