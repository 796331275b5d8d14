//! Configuration Module - Table Parameters
//!
//! Capacities, kind and checking behavior of one indirect reference table.
//! Presets cover the three table categories a runtime creates.

use crate::handle::{IndirectRefKind, MAX_TABLE_CAPACITY};

/// How lookups treat invalid handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Invalid lookups are logged and returned as errors
    Permissive,
    /// Invalid lookups are fatal
    Strict,
}

/// What a fatal condition does after the diagnostic dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalPolicy {
    /// Terminate the process
    Abort,
    /// Unwind with a panic carrying the diagnostic message
    Panic,
}

/// Configuration for one indirect reference table
///
/// # Examples
///
/// ```rust
/// use irt::{IrtConfig, CheckMode};
///
/// let config = IrtConfig {
///     max_capacity: 512,
///     check_mode: CheckMode::Strict,
///     ..IrtConfig::locals()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct IrtConfig {
    /// Table name used in logs and dumps
    pub name: String,

    /// Kind baked into every handle the table issues
    pub kind: IndirectRefKind,

    /// Slots allocated at creation
    ///
    /// Must be > 0 and <= max_capacity.
    pub initial_capacity: usize,

    /// Hard ceiling on entries, at most 65536
    ///
    /// Adding past this is fatal.
    pub max_capacity: usize,

    /// Invalid lookup handling
    ///
    /// Default: Permissive
    pub check_mode: CheckMode,

    /// Fatal condition handling
    ///
    /// Default: Abort
    pub fatal_policy: FatalPolicy,

    /// Enable the instrumented validation path
    ///
    /// Verifies objects on add, treats bad cookies as fatal, clears
    /// discarded slots on pop and keeps per-slot history.
    /// Default: on in debug builds
    pub debug_checks: bool,

    /// Allow `remove` to fall back to a linear scan by object address
    ///
    /// For callers that hand back direct pointers instead of handles.
    /// Makes removal O(n) on that path.
    /// Default: false
    pub compat_linear_scan_removal: bool,
}

impl IrtConfig {
    /// Preset for a per-thread local reference table
    pub fn locals() -> Self {
        Self {
            name: "locals".to_string(),
            kind: IndirectRefKind::Local,
            initial_capacity: DEFAULT_LOCALS_INITIAL,
            max_capacity: MAX_TABLE_CAPACITY,
            check_mode: CheckMode::Permissive,
            fatal_policy: FatalPolicy::Abort,
            debug_checks: cfg!(debug_assertions),
            compat_linear_scan_removal: false,
        }
    }

    /// Preset for the process-wide global reference table
    pub fn globals() -> Self {
        Self {
            name: "globals".to_string(),
            kind: IndirectRefKind::Global,
            initial_capacity: DEFAULT_GLOBALS_INITIAL,
            max_capacity: DEFAULT_GLOBALS_MAX,
            ..Self::locals()
        }
    }

    /// Preset for the process-wide weak global reference table
    pub fn weak_globals() -> Self {
        Self {
            name: "weak globals".to_string(),
            kind: IndirectRefKind::WeakGlobal,
            ..Self::globals()
        }
    }

    /// Validate configuration
    ///
    /// Requires `0 < initial_capacity <= max_capacity <= 65536`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use irt::IrtConfig;
    ///
    /// let config = IrtConfig {
    ///     max_capacity: 70_000,  // Invalid!
    ///     ..IrtConfig::locals()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidName(
                "table name must not be empty".to_string(),
            ));
        }

        if self.initial_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(
                "initial_capacity must be > 0".to_string(),
            ));
        }

        if self.initial_capacity > self.max_capacity {
            return Err(ConfigError::InvalidCapacity(format!(
                "initial_capacity {} exceeds max_capacity {}",
                self.initial_capacity, self.max_capacity
            )));
        }

        if self.max_capacity > MAX_TABLE_CAPACITY {
            return Err(ConfigError::InvalidCapacity(format!(
                "max_capacity {} exceeds handle index range {}",
                self.max_capacity, MAX_TABLE_CAPACITY
            )));
        }

        Ok(())
    }

    /// Apply environment overrides to this configuration
    ///
    /// Reads:
    /// - IRT_INITIAL_CAPACITY
    /// - IRT_MAX_CAPACITY
    /// - IRT_CHECK_MODE (`strict` | `permissive`)
    /// - IRT_DEBUG_CHECKS (`1` | `true`)
    /// - IRT_COMPAT_REMOVAL (`1` | `true`)
    /// - IRT_FATAL (`abort` | `panic`)
    ///
    /// Unparseable values are ignored.
    pub fn from_env(mut self) -> Self {
        if let Some(n) = env_usize("IRT_INITIAL_CAPACITY") {
            self.initial_capacity = n;
        }

        if let Some(n) = env_usize("IRT_MAX_CAPACITY") {
            self.max_capacity = n;
        }

        if let Ok(val) = std::env::var("IRT_CHECK_MODE") {
            if val.eq_ignore_ascii_case("strict") {
                self.check_mode = CheckMode::Strict;
            } else if val.eq_ignore_ascii_case("permissive") {
                self.check_mode = CheckMode::Permissive;
            }
        }

        if let Ok(val) = std::env::var("IRT_DEBUG_CHECKS") {
            self.debug_checks = env_flag(&val);
        }

        if let Ok(val) = std::env::var("IRT_COMPAT_REMOVAL") {
            self.compat_linear_scan_removal = env_flag(&val);
        }

        if let Ok(val) = std::env::var("IRT_FATAL") {
            if val.eq_ignore_ascii_case("panic") {
                self.fatal_policy = FatalPolicy::Panic;
            } else if val.eq_ignore_ascii_case("abort") {
                self.fatal_policy = FatalPolicy::Abort;
            }
        }

        self
    }
}

impl Default for IrtConfig {
    fn default() -> Self {
        Self::locals()
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),
}

// ============================================================================
// CONSTANTS & HELPERS
// ============================================================================

const DEFAULT_LOCALS_INITIAL: usize = 64;
const DEFAULT_GLOBALS_INITIAL: usize = 256;
const DEFAULT_GLOBALS_MAX: usize = 51_200;

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok()?.parse().ok()
}

fn env_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}
