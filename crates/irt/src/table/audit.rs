//! Instrumented Validation
//!
//! Debug-only bookkeeping selected by `IrtConfig::debug_checks`. The table
//! calls these hooks unconditionally; with checks disabled each one returns
//! immediately.
//!
//! Hooks:
//! - object verification on store
//! - per-slot history of previous occupants, for stale-use reports
//! - clearing of slots discarded by a segment pop

use super::slots::SlotTable;
use crate::object::{ObjectModel, ObjectRef};
use std::ops::Range;

/// Previous occupants remembered per slot
pub(crate) const HISTORY_DEPTH: usize = 3;

type History = [Option<ObjectRef>; HISTORY_DEPTH];

pub(crate) struct Audit {
    enabled: bool,
    history: Vec<History>,
}

impl Audit {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            history: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether `obj` may be stored. Always true with checks disabled.
    #[inline]
    pub(crate) fn verify_object(&self, objects: &dyn ObjectModel, obj: ObjectRef) -> bool {
        !self.enabled || objects.is_valid(obj)
    }

    /// Remember `obj` as the newest occupant of `index`
    #[inline]
    pub(crate) fn record_store(&mut self, index: usize, obj: ObjectRef) {
        if !self.enabled {
            return;
        }
        if self.history.len() <= index {
            self.history.resize(index + 1, [None; HISTORY_DEPTH]);
        }
        let entry = &mut self.history[index];
        entry.rotate_right(1);
        entry[0] = Some(obj);
    }

    /// Occupants of `index`, newest first
    pub(crate) fn history(&self, index: usize) -> Vec<ObjectRef> {
        self.history
            .get(index)
            .map(|entry| entry.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Suffix for diagnostics about a bad handle to `index`
    pub(crate) fn describe(&self, index: usize) -> String {
        let history = self.history(index);
        if history.is_empty() {
            return String::new();
        }
        let list: Vec<String> = history.iter().map(ObjectRef::to_string).collect();
        format!(" (slot history, newest first: {})", list.join(", "))
    }

    /// Clear slots discarded by a segment pop so stale contents cannot leak
    pub(crate) fn poison_discarded(&self, slots: &mut SlotTable, discarded: Range<usize>) {
        if !self.enabled {
            return;
        }
        for index in discarded {
            slots.clear(index);
        }
    }
}
