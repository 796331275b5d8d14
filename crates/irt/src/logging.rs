//! IRT Logging and Tracing
//!
//! Structured events for reference table activity, useful for:
//! - Tracking down native reference leaks
//! - Auditing misuse (stale, deleted, wrong-scope references)
//! - Post-mortem analysis of fatal overflow
//!
//! Events are kept in a bounded in-memory buffer and rendered through the
//! `log` facade under the `irt` target, as human-readable text or JSON.
//!
//! Log Levels:
//! - ERROR: Overflow, fatal conditions
//! - WARN: Invalid references, segment misuse
//! - INFO: Table creation, growth
//! - DEBUG: Rejected removals, compatibility removals, weak sweeps

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level for IRT events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    fn as_log(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

/// IRT event types
#[derive(Debug, Clone, PartialEq)]
pub enum IrtEvent {
    /// Table created
    TableCreated {
        table: String,
        kind: String,
        initial_capacity: usize,
        max_capacity: usize,
    },

    /// Backing storage grew
    TableGrown { table: String, from: usize, to: usize },

    /// Add attempted on a full table
    TableOverflow { table: String, max_capacity: usize },

    /// Lookup with a handle that failed validation
    InvalidReference { table: String, reason: String },

    /// Removal rejected (double delete, wrong segment, stale)
    RejectedRemoval {
        table: String,
        index: usize,
        reason: String,
    },

    /// Cookie inconsistent with the table state
    SegmentMisuse {
        table: String,
        cookie_top: usize,
        top_index: usize,
    },

    /// Removal satisfied by the linear-scan fallback
    CompatRemoval { table: String, index: usize },

    /// Weak referents updated or cleared by the collector
    WeakSweep {
        table: String,
        updated: usize,
        cleared: usize,
    },

    /// Fatal condition about to terminate
    Fatal { table: String, message: String },
}

impl IrtEvent {
    /// Level at which this event is reported
    pub fn level(&self) -> LogLevel {
        match self {
            IrtEvent::TableOverflow { .. } | IrtEvent::Fatal { .. } => LogLevel::Error,
            IrtEvent::InvalidReference { .. } | IrtEvent::SegmentMisuse { .. } => LogLevel::Warn,
            IrtEvent::TableCreated { .. }
            | IrtEvent::TableGrown { .. }
            | IrtEvent::WeakSweep { .. } => LogLevel::Info,
            IrtEvent::RejectedRemoval { .. } | IrtEvent::CompatRemoval { .. } => LogLevel::Debug,
        }
    }

    /// Human-readable rendering
    pub fn to_human(&self) -> String {
        match self {
            IrtEvent::TableCreated {
                table,
                kind,
                initial_capacity,
                max_capacity,
            } => format!(
                "[IRT] {} table '{}' created (capacity {}, max {})",
                kind, table, initial_capacity, max_capacity
            ),
            IrtEvent::TableGrown { table, from, to } => {
                format!("[IRT] '{}' grew from {} to {} slots", table, from, to)
            },
            IrtEvent::TableOverflow {
                table,
                max_capacity,
            } => format!(
                "[IRT] '{}' overflow: all {} slots in use",
                table, max_capacity
            ),
            IrtEvent::InvalidReference { table, reason } => {
                format!("[IRT] '{}' invalid reference: {}", table, reason)
            },
            IrtEvent::RejectedRemoval {
                table,
                index,
                reason,
            } => format!(
                "[IRT] '{}' removal of index {} rejected: {}",
                table, index, reason
            ),
            IrtEvent::SegmentMisuse {
                table,
                cookie_top,
                top_index,
            } => format!(
                "[IRT] '{}' segment misuse: cookie top {} above table top {}",
                table, cookie_top, top_index
            ),
            IrtEvent::CompatRemoval { table, index } => format!(
                "[IRT] '{}' removed index {} by address scan",
                table, index
            ),
            IrtEvent::WeakSweep {
                table,
                updated,
                cleared,
            } => format!(
                "[IRT] '{}' sweep: {} updated, {} cleared",
                table, updated, cleared
            ),
            IrtEvent::Fatal { table, message } => {
                format!("[IRT] '{}' FATAL: {}", table, message)
            },
        }
    }

    /// JSON rendering
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            IrtEvent::TableCreated {
                table,
                kind,
                initial_capacity,
                max_capacity,
            } => serde_json::json!({
                "type": "table_created",
                "table": table,
                "kind": kind,
                "initial_capacity": initial_capacity,
                "max_capacity": max_capacity
            }),
            IrtEvent::TableGrown { table, from, to } => serde_json::json!({
                "type": "table_grown",
                "table": table,
                "from": from,
                "to": to
            }),
            IrtEvent::TableOverflow {
                table,
                max_capacity,
            } => serde_json::json!({
                "type": "table_overflow",
                "table": table,
                "max_capacity": max_capacity
            }),
            IrtEvent::InvalidReference { table, reason } => serde_json::json!({
                "type": "invalid_reference",
                "table": table,
                "reason": reason
            }),
            IrtEvent::RejectedRemoval {
                table,
                index,
                reason,
            } => serde_json::json!({
                "type": "rejected_removal",
                "table": table,
                "index": index,
                "reason": reason
            }),
            IrtEvent::SegmentMisuse {
                table,
                cookie_top,
                top_index,
            } => serde_json::json!({
                "type": "segment_misuse",
                "table": table,
                "cookie_top": cookie_top,
                "top_index": top_index
            }),
            IrtEvent::CompatRemoval { table, index } => serde_json::json!({
                "type": "compat_removal",
                "table": table,
                "index": index
            }),
            IrtEvent::WeakSweep {
                table,
                updated,
                cleared,
            } => serde_json::json!({
                "type": "weak_sweep",
                "table": table,
                "updated": updated,
                "cleared": cleared
            }),
            IrtEvent::Fatal { table, message } => serde_json::json!({
                "type": "fatal",
                "table": table,
                "message": message
            }),
        }
    }
}

/// IRT logger configuration
#[derive(Debug, Clone)]
pub struct IrtLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Forward events to the `log` facade
    pub console: bool,

    /// Render forwarded events as JSON
    pub json: bool,

    /// Prefix forwarded events with a wall-clock timestamp
    pub timestamps: bool,

    /// Events retained in memory; older events are dropped
    pub max_events: usize,
}

impl Default for IrtLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            json: false,
            timestamps: true,
            max_events: 1024,
        }
    }
}

/// A retained event with its wall-clock time
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub timestamp: chrono::DateTime<chrono::Local>,
    pub event: IrtEvent,
}

/// IRT Logger - centralized event log for reference tables
pub struct IrtLogger {
    config: IrtLoggerConfig,
    events: Mutex<VecDeque<LoggedEvent>>,
    enabled: AtomicBool,
}

impl IrtLogger {
    /// Create new logger
    pub fn new(config: IrtLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(VecDeque::new()),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log an event
    pub fn log(&self, event: IrtEvent) {
        if !self.is_enabled() {
            return;
        }

        let level = event.level();
        if level > self.config.level {
            return;
        }

        let timestamp = chrono::Local::now();

        if self.config.console {
            self.output(&timestamp, &event, level);
        }

        let mut events = self.events.lock();
        if self.config.max_events > 0 && events.len() >= self.config.max_events {
            events.pop_front();
        }
        events.push_back(LoggedEvent { timestamp, event });
    }

    fn output(&self, timestamp: &chrono::DateTime<chrono::Local>, event: &IrtEvent, level: LogLevel) {
        let body = if self.config.json {
            event.to_json().to_string()
        } else {
            event.to_human()
        };

        if self.config.timestamps {
            log::log!(
                target: "irt",
                level.as_log(),
                "[{}] {}",
                timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                body
            );
        } else {
            log::log!(target: "irt", level.as_log(), "{}", body);
        }
    }

    /// Snapshot of retained events, oldest first
    pub fn events(&self) -> Vec<LoggedEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for IrtLogger {
    fn default() -> Self {
        Self::new(IrtLoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<IrtLogger> = Mutex::new(IrtLogger::default());
}

/// Log an event to the global logger
pub fn log_event(event: IrtEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Replace the global logger configuration
pub fn configure_logger(config: IrtLoggerConfig) {
    *GLOBAL_LOGGER.lock() = IrtLogger::new(config);
}

/// Events retained by the global logger
pub fn recent_events() -> Vec<LoggedEvent> {
    GLOBAL_LOGGER.lock().events()
}

/// Number of events retained by the global logger
pub fn event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grown() -> IrtEvent {
        IrtEvent::TableGrown {
            table: "locals".to_string(),
            from: 2,
            to: 4,
        }
    }

    #[test]
    fn test_logger_basic() {
        let logger = IrtLogger::default();
        logger.log(grown());
        assert_eq!(logger.event_count(), 1);
        assert_eq!(logger.events()[0].event, grown());
    }

    #[test]
    fn test_logger_disable() {
        let logger = IrtLogger::default();
        logger.disable();
        logger.log(grown());
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_level_filter() {
        let logger = IrtLogger::new(IrtLoggerConfig {
            level: LogLevel::Warn,
            ..Default::default()
        });
        logger.log(grown());
        logger.log(IrtEvent::TableOverflow {
            table: "locals".to_string(),
            max_capacity: 4,
        });
        assert_eq!(logger.event_count(), 1);
    }

    #[test]
    fn test_bounded_buffer_drops_oldest() {
        let logger = IrtLogger::new(IrtLoggerConfig {
            max_events: 2,
            console: false,
            ..Default::default()
        });
        for to in [4, 8, 16] {
            logger.log(IrtEvent::TableGrown {
                table: "locals".to_string(),
                from: to / 2,
                to,
            });
        }
        let events = logger.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, IrtEvent::TableGrown { to: 8, .. }));
    }

    #[test]
    fn test_json_rendering() {
        let json = grown().to_json();
        assert_eq!(json["type"], "table_grown");
        assert_eq!(json["to"], 4);
    }

    #[test]
    fn test_global_logger() {
        log_event(IrtEvent::TableOverflow {
            table: "global-logger-test".to_string(),
            max_capacity: 1,
        });
        assert!(event_count() > 0);
    }
}
