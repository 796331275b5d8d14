//! Test Utilities for the IRT Test Suite
//!
//! Fixtures build tables with `FatalPolicy::Panic` so fatal paths can be
//! observed with `#[should_panic]` instead of aborting the test binary.

#![allow(dead_code)]

use irt::{
    IndirectRefKind, IndirectReferenceTable, IrtConfig, FatalPolicy, ObjectModel, ObjectRef,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Spacing between fabricated object addresses
pub const OBJECT_ALIGNMENT: usize = 16;

/// Fabricated object address for test object `n`
pub fn obj(n: usize) -> ObjectRef {
    ObjectRef::new(0x1000 + n * OBJECT_ALIGNMENT).expect("nonzero address")
}

/// ============================================================================
/// OBJECT MODEL
/// ============================================================================

/// Registry of fake heap objects with type names and sizes
#[derive(Default)]
pub struct TestHeap {
    objects: RwLock<HashMap<usize, (String, usize)>>,
}

impl TestHeap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register object `n` and return its reference
    pub fn alloc(&self, n: usize, type_name: &str, size: usize) -> ObjectRef {
        let o = obj(n);
        self.objects
            .write()
            .insert(o.address(), (type_name.to_string(), size));
        o
    }

    /// Forget an object so `is_valid` rejects it
    pub fn free(&self, o: ObjectRef) {
        self.objects.write().remove(&o.address());
    }
}

impl ObjectModel for TestHeap {
    fn is_valid(&self, o: ObjectRef) -> bool {
        self.objects.read().contains_key(&o.address())
    }

    fn size_of(&self, o: ObjectRef) -> usize {
        self.objects.read().get(&o.address()).map_or(0, |(_, size)| *size)
    }

    fn type_name(&self, o: ObjectRef) -> String {
        self.objects
            .read()
            .get(&o.address())
            .map_or_else(|| "<unknown>".to_string(), |(name, _)| name.clone())
    }
}

/// ============================================================================
/// TABLE FIXTURES
/// ============================================================================

/// Configuration with panicking fatal handling and debug checks off
pub fn config(kind: IndirectRefKind, initial: usize, max: usize) -> IrtConfig {
    let preset = match kind {
        IndirectRefKind::Local => IrtConfig::locals(),
        IndirectRefKind::Global => IrtConfig::globals(),
        IndirectRefKind::WeakGlobal => IrtConfig::weak_globals(),
    };
    IrtConfig {
        initial_capacity: initial,
        max_capacity: max,
        fatal_policy: FatalPolicy::Panic,
        debug_checks: false,
        ..preset
    }
}

/// Local table with panicking fatal handling
pub fn local_table(initial: usize, max: usize) -> IndirectReferenceTable {
    IndirectReferenceTable::new(config(IndirectRefKind::Local, initial, max))
        .expect("valid table configuration")
}

/// Local table with debug checks against `heap`
pub fn checked_table(heap: Arc<TestHeap>, initial: usize, max: usize) -> IndirectReferenceTable {
    IndirectReferenceTable::with_object_model(
        IrtConfig {
            debug_checks: true,
            ..config(IndirectRefKind::Local, initial, max)
        },
        heap,
    )
    .expect("valid table configuration")
}

/// Assert the table's bookkeeping agrees with its contents
pub fn assert_consistent(table: &IndirectReferenceTable) {
    let live = table.roots().count() + table.dump().cleared;
    assert!(
        table.hole_count() <= table.entry_count(),
        "hole_count {} exceeds top_index {}",
        table.hole_count(),
        table.entry_count()
    );
    assert_eq!(
        live,
        table.entry_count() - table.hole_count(),
        "occupied slots disagree with top_index - hole_count"
    );
    assert!(table.entry_count() <= table.capacity());
    assert!(table.capacity() <= table.max_capacity());
}
