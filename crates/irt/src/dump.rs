//! Table Diagnostics
//!
//! Read-only summary of table contents for leak and overflow debugging.
//! Never called on a hot path. The rendered format is for humans and logs
//! and carries no compatibility guarantee.

use crate::handle::IndirectRefKind;
use crate::object::ObjectModel;
use crate::table::slots::Slot;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Live entries listed individually at the end of a dump
pub const RECENT_ENTRIES: usize = 10;

/// Occupants of one type and size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpGroup {
    pub type_name: String,
    pub size: usize,
    pub count: usize,
}

/// One live entry near the top of the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpEntry {
    pub index: usize,
    pub address: usize,
    pub type_name: String,
}

/// Snapshot of a table's occupancy
#[derive(Debug, Clone, Serialize)]
pub struct TableDump {
    pub table: String,
    pub kind: IndirectRefKind,
    pub capacity: usize,
    pub max_capacity: usize,
    pub top_index: usize,
    pub holes: usize,
    pub live: usize,
    pub cleared: usize,
    /// Grouped by `(type, size)`, most frequent first
    pub groups: Vec<DumpGroup>,
    /// Up to `RECENT_ENTRIES` live entries closest to the top, oldest first
    pub recent: Vec<DumpEntry>,
}

pub(crate) struct DumpSource<'a> {
    pub(crate) table: &'a str,
    pub(crate) kind: IndirectRefKind,
    pub(crate) capacity: usize,
    pub(crate) max_capacity: usize,
    pub(crate) holes: usize,
    pub(crate) slots: &'a [Slot],
    pub(crate) objects: &'a dyn ObjectModel,
}

impl TableDump {
    pub(crate) fn collect(source: DumpSource<'_>) -> Self {
        let mut grouped: IndexMap<(String, usize), usize> = IndexMap::new();
        let mut live = 0;
        let mut cleared = 0;

        for slot in source.slots {
            match *slot {
                Slot::Live(obj) => {
                    live += 1;
                    let key = (source.objects.type_name(obj), source.objects.size_of(obj));
                    *grouped.entry(key).or_insert(0) += 1;
                },
                Slot::Cleared => cleared += 1,
                Slot::Empty => {},
            }
        }

        let mut groups: Vec<DumpGroup> = grouped
            .into_iter()
            .map(|((type_name, size), count)| DumpGroup {
                type_name,
                size,
                count,
            })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count));

        let mut recent: Vec<DumpEntry> = source
            .slots
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(index, slot)| match *slot {
                Slot::Live(obj) => Some(DumpEntry {
                    index,
                    address: obj.address(),
                    type_name: source.objects.type_name(obj),
                }),
                _ => None,
            })
            .take(RECENT_ENTRIES)
            .collect();
        recent.reverse();

        Self {
            table: source.table.to_string(),
            kind: source.kind,
            capacity: source.capacity,
            max_capacity: source.max_capacity,
            top_index: source.slots.len(),
            holes: source.holes,
            live,
            cleared,
            groups,
            recent,
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

impl fmt::Display for TableDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} reference table '{}': {} entries ({} live, {} holes, {} cleared), capacity {}/{}",
            self.kind,
            self.table,
            self.top_index,
            self.live,
            self.holes,
            self.cleared,
            self.capacity,
            self.max_capacity
        )?;

        if self.live == 0 {
            return writeln!(f, "  (empty)");
        }

        writeln!(f, "  Last {} entries (of {}):", self.recent.len(), self.live)?;
        for entry in &self.recent {
            writeln!(
                f,
                "    {:5}: 0x{:016X} {}",
                entry.index, entry.address, entry.type_name
            )?;
        }

        writeln!(f, "  Summary:")?;
        for group in &self.groups {
            writeln!(
                f,
                "    {:6} of {} ({} bytes)",
                group.count, group.type_name, group.size
            )?;
        }
        Ok(())
    }
}
