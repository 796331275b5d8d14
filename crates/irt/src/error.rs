//! Error Module - IRT Error Types
//!
//! Defines all error types used by the indirect reference table.
//!
//! # Error Categories
//!
//! ## Setup Errors
//! - `Configuration` - Invalid table configuration, rejected at creation
//! - `AllocationFailed` - Backing storage could not be reserved
//!
//! ## Capacity Errors
//! - `TableOverflow` - Table already holds `max_capacity` entries
//!
//! ## Misuse Errors
//! - `InvalidReference` - Handle failed validation on lookup
//! - `SegmentMisuse` - Cookie inconsistent with the table state
//! - `InvalidObject` - Object rejected by the object model
//!
//! ## Informational
//! - `ClearedReference` - Weak referent was cleared by the collector

use crate::config::ConfigError;
use crate::handle::IndirectRefKind;
use thiserror::Error;

/// Why a handle failed validation
///
/// Reasons are listed in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidRefReason {
    /// Raw value was zero
    #[error("null reference")]
    Null,

    /// Kind bits are zero, typically a direct object pointer passed as a handle
    #[error("unknown reference kind in {raw:#x}")]
    UnknownKind { raw: u64 },

    /// Handle was issued by a table of another kind
    #[error("{actual} reference used with {expected} table")]
    WrongKind {
        expected: IndirectRefKind,
        actual: IndirectRefKind,
    },

    /// Index at or past the top of the table (never issued, or discarded by a segment pop)
    #[error("index {index} out of bounds (top index {top_index})")]
    OutOfBounds { index: usize, top_index: usize },

    /// Slot has been removed and not reused
    #[error("use of deleted reference at index {index}")]
    Deleted { index: usize },

    /// Slot was reused since the handle was issued
    #[error("stale reference at index {index} (handle serial {handle_serial}, slot serial {slot_serial})")]
    Stale {
        index: usize,
        handle_serial: u32,
        slot_serial: u32,
    },
}

/// Main error type for all IRT operations
///
/// # Examples
///
/// ```rust
/// use irt::{IrtError, InvalidRefReason};
///
/// fn describe(err: &IrtError) -> &'static str {
///     match err {
///         IrtError::InvalidReference { reason: InvalidRefReason::Stale { .. }, .. } => "stale",
///         IrtError::TableOverflow { .. } => "overflow",
///         _ => "other",
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum IrtError {
    /// Configuration error
    ///
    /// **When returned:** Table creation with invalid capacities or name
    ///
    /// **Recovery strategy:** Fix configuration; no state was established
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Backing storage allocation failed
    ///
    /// **When returned:** `create` or `ensure_free_capacity` could not reserve memory
    ///
    /// **Recovery strategy:** Explicit failure to the caller. During `add`
    /// this is escalated to fatal instead.
    #[error("Allocation failed: could not reserve {requested} slots ({reason})")]
    AllocationFailed { requested: usize, reason: String },

    /// Table overflow
    ///
    /// **When returned:** `try_add` or `ensure_free_capacity` past `max_capacity`
    ///
    /// **Recovery strategy:** None from `add` (fatal). Native code leaked references.
    #[error("Table overflow: {table} is full (max capacity {max_capacity})")]
    TableOverflow { table: String, max_capacity: usize },

    /// Invalid or stale handle on lookup
    ///
    /// **When returned:** `get`, `update`, `get_raw` on a handle that fails validation
    ///
    /// **Recovery strategy:** Treat as "not found". Strict mode escalates to fatal.
    #[error("Invalid reference in {table}: {reason}")]
    InvalidReference {
        table: String,
        reason: InvalidRefReason,
    },

    /// Weak referent was cleared by the collector
    ///
    /// **When returned:** `get` on a weak-global slot swept as dead
    ///
    /// **Recovery strategy:** Treat the referent as null; the handle stays removable
    #[error("Reference at index {index} has been cleared")]
    ClearedReference { index: usize },

    /// Object rejected by the object model
    ///
    /// **When returned:** `try_add` or `update` with debug checks enabled
    #[error("Invalid object address: {address:#x}")]
    InvalidObject { address: usize },

    /// Segment cookie inconsistent with the table state
    ///
    /// **When returned:** `pop_segment` or `remove` with a cookie above the current top
    ///
    /// **Recovery strategy:** Fatal with debug checks; otherwise ignored
    #[error("Segment misuse: cookie (top {cookie_top}, holes {cookie_holes}) does not fit table (top {top_index}, holes {hole_count})")]
    SegmentMisuse {
        cookie_top: usize,
        cookie_holes: usize,
        top_index: usize,
        hole_count: usize,
    },

    /// Invalid argument
    ///
    /// **When returned:** Operation not meaningful for this table (e.g. sweeping a local table)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl IrtError {
    /// Check if this error must terminate the process when raised from `add`
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IrtError::TableOverflow { .. } | IrtError::AllocationFailed { .. }
        )
    }

    /// Check if this error indicates misuse by native code
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            IrtError::InvalidReference { .. }
                | IrtError::SegmentMisuse { .. }
                | IrtError::InvalidObject { .. }
        )
    }

    /// Reason for an invalid reference, if that is what this error is
    pub fn invalid_reason(&self) -> Option<InvalidRefReason> {
        match self {
            IrtError::InvalidReference { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Result type alias for IRT operations
pub type Result<T> = std::result::Result<T, IrtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_is_fatal() {
        let err = IrtError::TableOverflow {
            table: "locals".to_string(),
            max_capacity: 4,
        };
        assert!(err.is_fatal());
        assert!(!err.is_misuse());
    }

    #[test]
    fn test_invalid_reference_is_misuse() {
        let err = IrtError::InvalidReference {
            table: "locals".to_string(),
            reason: InvalidRefReason::Deleted { index: 3 },
        };
        assert!(err.is_misuse());
        assert_eq!(err.invalid_reason(), Some(InvalidRefReason::Deleted { index: 3 }));
        assert!(err.to_string().contains("deleted reference at index 3"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: IrtError = ConfigError::InvalidCapacity("zero".to_string()).into();
        assert!(matches!(err, IrtError::Configuration(_)));
    }
}
