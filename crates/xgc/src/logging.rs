//! Collector Logging and Tracing
//!
//! Structured cycle events, buffered per logger and optionally printed.
//! Every event is also forwarded to the `log` facade at its level, so an
//! embedder's logger sees cycles without enabling console output.
//!
//! Log Levels:
//! - ERROR: rejected cycles
//! - INFO: cycle start/end
//! - DEBUG: graph sizes, unlink/repair counts, released references
//! - TRACE: phase timings (per-object detail goes straight to `log::trace!`)

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for collector events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Collector event types
#[derive(Debug, Clone, PartialEq)]
pub enum XgcEvent {
    /// Cycle started
    CycleStart {
        cycle: u64,
        mode: String,
        reason: String,
    },

    /// Edge graph built on the local side
    GraphBuilt {
        cycle: u64,
        entries: usize,
        roots: usize,
        edges: usize,
    },

    /// Manager phase completed
    PhaseEnd {
        cycle: u64,
        phase: String,
        duration_ms: f64,
    },

    /// Export slots severed by Unlink
    Unlinked { cycle: u64, count: usize },

    /// Export slots reinstated by Repair
    Repaired { cycle: u64, count: usize },

    /// Cycle completed
    CycleEnd {
        cycle: u64,
        duration_ms: f64,
        live_exports: usize,
        detached_exports: usize,
    },

    /// Cycle rejected; no table was mutated
    CycleFailed { cycle: u64, error: String },

    /// Dead references released on one side
    ReferencesReleased { side: String, count: usize },
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct XgcLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,
}

impl Default for XgcLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            console: false,
            json: false,
            timestamps: true,
        }
    }
}

impl XgcLoggerConfig {
    /// Console configuration for `XgcConfig::verbose`
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Info,
            console: true,
            ..Self::default()
        }
    }
}

/// XgcLogger - event buffer plus optional console output
pub struct XgcLogger {
    config: XgcLoggerConfig,
    events: Mutex<Vec<(Instant, XgcEvent)>>,
    enabled: AtomicBool,
}

impl XgcLogger {
    /// Create new logger
    pub fn new(config: XgcLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
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
    pub fn log(&self, event: XgcEvent) {
        if !self.is_enabled() {
            return;
        }

        let level = Self::event_level(&event);
        if level > self.config.level {
            return;
        }

        log::log!(log::Level::from(level), "{}", Self::format_human(&event));

        if self.config.console {
            self.output_console(&event);
        }

        self.events.lock().push((Instant::now(), event));
    }

    fn event_level(event: &XgcEvent) -> LogLevel {
        match event {
            XgcEvent::CycleFailed { .. } => LogLevel::Error,
            XgcEvent::CycleStart { .. } | XgcEvent::CycleEnd { .. } => LogLevel::Info,
            XgcEvent::GraphBuilt { .. }
            | XgcEvent::Unlinked { .. }
            | XgcEvent::Repaired { .. }
            | XgcEvent::ReferencesReleased { .. } => LogLevel::Debug,
            XgcEvent::PhaseEnd { .. } => LogLevel::Trace,
        }
    }

    fn output_console(&self, event: &XgcEvent) {
        let line = if self.config.json {
            match serde_json::to_string(&Self::to_json(event)) {
                Ok(line) => line,
                Err(_) => return,
            }
        } else {
            Self::format_human(event)
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            println!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), line);
        } else {
            println!("{}", line);
        }
    }

    /// Human-readable line for `event`
    pub fn format_human(event: &XgcEvent) -> String {
        match event {
            XgcEvent::CycleStart {
                cycle,
                mode,
                reason,
            } => format!("[XGC] Cycle {} started ({} graph, reason: {})", cycle, mode, reason),
            XgcEvent::GraphBuilt {
                cycle,
                entries,
                roots,
                edges,
            } => format!(
                "[XGC] Cycle {}: edge graph with {} entries ({} roots, {} edges)",
                cycle, entries, roots, edges
            ),
            XgcEvent::PhaseEnd {
                cycle,
                phase,
                duration_ms,
            } => format!(
                "[XGC] Cycle {}: {} phase completed ({:.2}ms)",
                cycle, phase, duration_ms
            ),
            XgcEvent::Unlinked { cycle, count } => {
                format!("[XGC] Cycle {}: unlinked {} export slots", cycle, count)
            },
            XgcEvent::Repaired { cycle, count } => {
                format!("[XGC] Cycle {}: repaired {} export slots", cycle, count)
            },
            XgcEvent::CycleEnd {
                cycle,
                duration_ms,
                live_exports,
                detached_exports,
            } => format!(
                "[XGC] Cycle {} completed ({:.2}ms, {} live, {} detached)",
                cycle, duration_ms, live_exports, detached_exports
            ),
            XgcEvent::CycleFailed { cycle, error } => {
                format!("[XGC] Cycle {} rejected: {}", cycle, error)
            },
            XgcEvent::ReferencesReleased { side, count } => {
                format!("[XGC] {}: released {} dead references", side, count)
            },
        }
    }

    /// JSON object for `event`
    pub fn to_json(event: &XgcEvent) -> serde_json::Value {
        match event {
            XgcEvent::CycleStart {
                cycle,
                mode,
                reason,
            } => serde_json::json!({
                "type": "cycle_start",
                "cycle": cycle,
                "mode": mode,
                "reason": reason
            }),
            XgcEvent::GraphBuilt {
                cycle,
                entries,
                roots,
                edges,
            } => serde_json::json!({
                "type": "graph_built",
                "cycle": cycle,
                "entries": entries,
                "roots": roots,
                "edges": edges
            }),
            XgcEvent::PhaseEnd {
                cycle,
                phase,
                duration_ms,
            } => serde_json::json!({
                "type": "phase_end",
                "cycle": cycle,
                "phase": phase,
                "duration_ms": duration_ms
            }),
            XgcEvent::Unlinked { cycle, count } => serde_json::json!({
                "type": "unlinked",
                "cycle": cycle,
                "count": count
            }),
            XgcEvent::Repaired { cycle, count } => serde_json::json!({
                "type": "repaired",
                "cycle": cycle,
                "count": count
            }),
            XgcEvent::CycleEnd {
                cycle,
                duration_ms,
                live_exports,
                detached_exports,
            } => serde_json::json!({
                "type": "cycle_end",
                "cycle": cycle,
                "duration_ms": duration_ms,
                "live_exports": live_exports,
                "detached_exports": detached_exports
            }),
            XgcEvent::CycleFailed { cycle, error } => serde_json::json!({
                "type": "cycle_failed",
                "cycle": cycle,
                "error": error
            }),
            XgcEvent::ReferencesReleased { side, count } => serde_json::json!({
                "type": "references_released",
                "side": side,
                "count": count
            }),
        }
    }

    /// Get all events
    pub fn get_events(&self) -> Vec<(Instant, XgcEvent)> {
        self.events.lock().clone()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for XgcLogger {
    fn default() -> Self {
        Self::new(XgcLoggerConfig::default())
    }
}
