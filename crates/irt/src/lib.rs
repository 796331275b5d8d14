//! # IRT - Indirect Reference Tables
//!
//! IRT hands managed heap objects to native code as opaque, validated handles
//! instead of raw pointers. The runtime keeps the real pointer in a table
//! slot, so the collector can move or reclaim objects while native code holds
//! a reference, and misuse by native code (use after delete, double delete,
//! references escaping their call frame) is detected instead of corrupting
//! the heap.
//!
//! ## Overview
//!
//! - **Encoded handles**: kind, slot index and a liveness serial packed into 64 bits
//! - **Segments**: O(1) push/pop of `(top_index, hole_count)` cookies per native frame
//! - **Hole packing**: interior removals leave holes that later adds in the same segment reuse
//! - **Staleness detection**: every slot reuse bumps the serial, invalidating older handles
//! - **Collector interface**: root scan, relocation and weak sweep over the dense prefix
//!
//! ## Quick Start
//!
//! ```rust
//! use irt::{IndirectReferenceTable, IndirectRefKind, ObjectRef};
//!
//! fn main() -> Result<(), irt::IrtError> {
//!     let mut locals = IndirectReferenceTable::create(16, 512, IndirectRefKind::Local)?;
//!
//!     // Native call entry
//!     let cookie = locals.push_segment();
//!     let arg = ObjectRef::new(0x7f00_0000_1000).unwrap();
//!     let handle = locals.append_fast(cookie, arg);
//!
//!     // Native code passes the handle back
//!     assert_eq!(locals.get(handle)?, arg);
//!     assert!(locals.remove(cookie, handle));
//!
//!     // Native call exit
//!     locals.pop_segment(cookie);
//!     Ok(())
//! }
//! ```
//!
//! ## Handle Layout
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────┬──────┐
//! │        Serial (46 bits)      │  Index (16 bits) │ Kind │
//! │            63-18             │       17-2       │  1-0 │
//! └──────────────────────────────┴──────────────────┴──────┘
//! ```
//!
//! ## Table Layout
//!
//! ```text
//!  index:  0     1     2     3     4     5     6     7
//!        ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//!        │ obj │ ░░░ │ obj │ obj │ obj │     │     │     │
//!        └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!          ▲                 ▲           ▲                 ▲
//!          outer cookie      inner       top_index         capacity
//!          (0, 0)            cookie      (5)               (8)
//!                            (3, 1)
//!
//!  ░░░ = hole (hole_count = 1)
//! ```
//!
//! ## Error Handling
//!
//! Configuration and allocation errors at creation return `IrtError`.
//! Overflow and growth failure inside `add` are fatal: the table is dumped
//! and the process aborts (or panics, with `FatalPolicy::Panic`). Invalid
//! lookups are logged and returned as errors; invalid removals return
//! `false`.
//!
//! ### Thread Safety
//!
//! - `IndirectReferenceTable` is `Send + Sync` but not internally synchronized;
//!   mutation takes `&mut self`
//! - `GlobalReferences` wraps a table in a `RwLock` for process-wide use
//!
//! ## Environment Variables
//!
//! `IrtConfig::from_env` reads `IRT_INITIAL_CAPACITY`, `IRT_MAX_CAPACITY`,
//! `IRT_CHECK_MODE`, `IRT_DEBUG_CHECKS`, `IRT_COMPAT_REMOVAL` and `IRT_FATAL`.

pub mod config;
pub mod dump;
pub mod error;
pub mod handle;
pub mod object;
pub mod segment;
pub mod table;

// Collector and runtime integration
pub mod global;
pub mod roots;
pub mod scope;

// Monitoring
pub mod logging;
pub mod stats;

mod fatal;

pub use config::{CheckMode, ConfigError, FatalPolicy, IrtConfig};
pub use dump::TableDump;
pub use error::{InvalidRefReason, IrtError, Result};
pub use global::{GlobalReferences, ReferenceTables};
pub use handle::{IndirectRef, IndirectRefKind, MAX_TABLE_CAPACITY};
pub use object::{ObjectModel, ObjectRef, OpaqueObjects};
pub use roots::{RootEntry, Roots, SweepStats};
pub use scope::LocalScope;
pub use segment::Cookie;
pub use stats::{IrtStats, IrtStatsSnapshot};
pub use table::IndirectReferenceTable;

/// IRT version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a local reference table from `IrtConfig::locals()` with environment overrides
///
/// # Examples
///
/// ```rust
/// let locals = irt::locals_from_env()?;
/// assert_eq!(locals.entry_count(), 0);
/// # Ok::<(), irt::IrtError>(())
/// ```
pub fn locals_from_env() -> Result<IndirectReferenceTable> {
    IndirectReferenceTable::new(IrtConfig::locals().from_env())
}
