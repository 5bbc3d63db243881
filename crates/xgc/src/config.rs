//! Configuration Module - Collector Tuning Parameters
//!
//! None of these settings affect correctness. They choose between the exact
//! and the approximate graph builder, decide whether the remote side forces
//! its own collector inside a cycle, and set how often cycles and dead
//! reference notifications are scheduled.

use std::time::Duration;

/// Which edge-graph builder a cycle uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphMode {
    /// Per-export tracing with bitmaps; every edge is real
    Exact,
    /// Bloom-filter batch propagation; bounded cost, may over-report edges
    Approximate,
}

impl GraphMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphMode::Exact => "exact",
            GraphMode::Approximate => "approximate",
        }
    }
}

impl std::str::FromStr for GraphMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" | "simple" => Ok(GraphMode::Exact),
            "approximate" | "bloom" | "bloomfilter" => Ok(GraphMode::Approximate),
            other => Err(ConfigError::InvalidGraphMode(other.to_string())),
        }
    }
}

/// Main configuration for the cross-heap collector
///
/// # Examples
///
/// ```rust
/// use xgc::{GraphMode, XgcConfig};
///
/// let config = XgcConfig {
///     graph_mode: GraphMode::Approximate,
///     force_native_gc: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct XgcConfig {
    /// Edge-graph builder
    ///
    /// Default: Exact
    pub graph_mode: GraphMode,

    /// Run the remote native collector between Unlink and Repair
    ///
    /// Used for benchmarking and verification; reclaims a dead cycle in the
    /// same round trip instead of the next one.
    /// Default: false
    pub force_native_gc: bool,

    /// Calls between dead-reference piggyback notifications
    ///
    /// Default: 100
    pub piggyback_threshold: u32,

    /// Calls after which a full collection cycle is due
    ///
    /// Default: 10_000
    pub cycle_call_threshold: u64,

    /// Time after which a full collection cycle is due (milliseconds)
    ///
    /// If 0, only the call count triggers cycles.
    /// Default: 5000
    pub cycle_interval_ms: u64,

    /// Initial capacity of traversal work queues (grows on demand)
    ///
    /// Default: 16K entries
    pub queue_capacity: usize,

    /// Seed mixed into every Bloom filter insertion
    ///
    /// Both sides of a union must use the same seed.
    pub bloom_seed: u64,

    /// Print cycle events to the console
    ///
    /// Default: false
    pub verbose: bool,
}

/// Default queue capacity (16K entries)
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024 * 16;

/// Default Bloom filter seed
pub const DEFAULT_BLOOM_SEED: u64 = 0xafb2_041e_0610_71db;

impl Default for XgcConfig {
    fn default() -> Self {
        XgcConfig {
            graph_mode: GraphMode::Exact,
            force_native_gc: false,
            piggyback_threshold: 100,
            cycle_call_threshold: 10_000,
            cycle_interval_ms: 5000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bloom_seed: DEFAULT_BLOOM_SEED,
            verbose: false,
        }
    }
}

impl XgcConfig {
    /// Validate configuration
    ///
    /// ```rust
    /// use xgc::XgcConfig;
    ///
    /// let config = XgcConfig {
    ///     queue_capacity: 1,
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity < 2 {
            return Err(ConfigError::InvalidQueueCapacity(
                "queue_capacity must be at least 2".to_string(),
            ));
        }

        if self.piggyback_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "piggyback_threshold must be > 0".to_string(),
            ));
        }

        if self.cycle_call_threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "cycle_call_threshold must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Cycle interval as a `Duration`, `None` when time-based triggering is off
    pub fn cycle_interval(&self) -> Option<Duration> {
        if self.cycle_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.cycle_interval_ms))
        }
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - XGC_GRAPH_MODE (`exact` or `approximate`)
    /// - XGC_FORCE_NATIVE_GC
    /// - XGC_PIGGYBACK_THRESHOLD
    /// - XGC_CYCLE_CALLS
    /// - XGC_CYCLE_INTERVAL_MS
    /// - XGC_VERBOSE
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("XGC_GRAPH_MODE") {
            if let Ok(mode) = val.parse::<GraphMode>() {
                config.graph_mode = mode;
            }
        }

        if let Ok(val) = std::env::var("XGC_FORCE_NATIVE_GC") {
            config.force_native_gc = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("XGC_PIGGYBACK_THRESHOLD") {
            if let Ok(n) = val.parse::<u32>() {
                config.piggyback_threshold = n;
            }
        }

        if let Ok(val) = std::env::var("XGC_CYCLE_CALLS") {
            if let Ok(n) = val.parse::<u64>() {
                config.cycle_call_threshold = n;
            }
        }

        if let Ok(val) = std::env::var("XGC_CYCLE_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.cycle_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("XGC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        config
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true") || val.eq_ignore_ascii_case("yes")
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid graph mode: {0}")]
    InvalidGraphMode(String),

    #[error("Invalid queue capacity: {0}")]
    InvalidQueueCapacity(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}
