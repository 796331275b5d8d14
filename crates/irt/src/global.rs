//! Global Reference Tables
//!
//! Process-wide strong and weak tables shared by every native thread. Each
//! table sits behind a `parking_lot::RwLock`: lookups take the read lock,
//! mutation and collector passes take the write lock. Global tables never
//! push segments, so every operation uses the bottom cookie.
//!
//! `ReferenceTables` routes a raw handle to the table that issued it by its
//! kind bits, the way a native-call dispatch layer resolves a reference
//! argument.

use crate::config::IrtConfig;
use crate::dump::TableDump;
use crate::error::{InvalidRefReason, IrtError, Result};
use crate::handle::{IndirectRef, IndirectRefKind};
use crate::object::{ObjectModel, ObjectRef, OpaqueObjects};
use crate::roots::{RootEntry, SweepStats};
use crate::segment::Cookie;
use crate::table::IndirectReferenceTable;
use parking_lot::RwLock;
use std::sync::Arc;

/// A reference table shared between threads
pub struct GlobalReferences {
    table: RwLock<IndirectReferenceTable>,
}

impl GlobalReferences {
    pub fn new(config: IrtConfig) -> Result<Self> {
        Self::with_object_model(config, Arc::new(OpaqueObjects))
    }

    pub fn with_object_model(config: IrtConfig, objects: Arc<dyn ObjectModel>) -> Result<Self> {
        if config.kind == IndirectRefKind::Local {
            return Err(IrtError::InvalidArgument(
                "global references need a global or weak global table".to_string(),
            ));
        }
        Ok(Self {
            table: RwLock::new(IndirectReferenceTable::with_object_model(config, objects)?),
        })
    }

    pub fn kind(&self) -> IndirectRefKind {
        self.table.read().kind()
    }

    pub fn add(&self, obj: ObjectRef) -> IndirectRef {
        self.table.write().add(Cookie::FIRST, obj)
    }

    pub fn try_add(&self, obj: ObjectRef) -> Result<IndirectRef> {
        self.table.write().try_add(Cookie::FIRST, obj)
    }

    pub fn remove(&self, handle: IndirectRef) -> bool {
        self.table.write().remove(Cookie::FIRST, handle)
    }

    pub fn get(&self, handle: IndirectRef) -> Result<ObjectRef> {
        self.table.read().get(handle)
    }

    pub fn update(&self, handle: IndirectRef, obj: ObjectRef) -> Result<()> {
        self.table.write().update(handle, obj)
    }

    pub fn is_valid_reference(&self, handle: IndirectRef) -> bool {
        self.table.read().is_valid_reference(handle)
    }

    pub fn entry_count(&self) -> usize {
        self.table.read().entry_count()
    }

    pub fn dump(&self) -> TableDump {
        self.table.read().dump()
    }

    /// Call `visit` for every live entry under the read lock
    pub fn visit_roots<F>(&self, mut visit: F)
    where
        F: FnMut(RootEntry),
    {
        let table = self.table.read();
        for root in table.roots() {
            visit(root);
        }
    }

    /// Rewrite entries after relocation. Returns the number that moved.
    pub fn update_roots<F>(&self, forward: F) -> usize
    where
        F: FnMut(ObjectRef) -> ObjectRef,
    {
        self.table.write().update_roots(forward)
    }

    /// Clear dead weak referents
    pub fn sweep<F>(&self, is_alive: F) -> Result<SweepStats>
    where
        F: FnMut(ObjectRef) -> Option<ObjectRef>,
    {
        self.table.write().sweep(is_alive)
    }
}

/// Global and weak global tables of one runtime
pub struct ReferenceTables {
    pub globals: GlobalReferences,
    pub weak_globals: GlobalReferences,
}

impl ReferenceTables {
    /// Create both tables with the default presets
    pub fn new() -> Result<Self> {
        Self::with_configs(IrtConfig::globals(), IrtConfig::weak_globals())
    }

    pub fn with_configs(globals: IrtConfig, weak_globals: IrtConfig) -> Result<Self> {
        Ok(Self {
            globals: GlobalReferences::new(globals)?,
            weak_globals: GlobalReferences::new(weak_globals)?,
        })
    }

    /// Resolve a handle of any kind
    ///
    /// Local handles go to `locals`, the calling thread's table.
    pub fn resolve(&self, locals: &IndirectReferenceTable, handle: IndirectRef) -> Result<ObjectRef> {
        match handle.kind() {
            Some(IndirectRefKind::Local) => locals.get(handle),
            Some(IndirectRefKind::Global) => self.globals.get(handle),
            Some(IndirectRefKind::WeakGlobal) => self.weak_globals.get(handle),
            None => Err(IrtError::InvalidReference {
                table: "dispatch".to_string(),
                reason: InvalidRefReason::UnknownKind { raw: handle.raw() },
            }),
        }
    }

    /// Delete a handle of any kind; local handles are bounded by `cookie`
    pub fn delete(&self, locals: &mut IndirectReferenceTable, cookie: Cookie, handle: IndirectRef) -> bool {
        match handle.kind() {
            Some(IndirectRefKind::Global) => self.globals.remove(handle),
            Some(IndirectRefKind::WeakGlobal) => self.weak_globals.remove(handle),
            // Unknown kinds go to the local table, which may run the address scan.
            Some(IndirectRefKind::Local) | None => locals.remove(cookie, handle),
        }
    }
}
