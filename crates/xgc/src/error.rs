//! Error Module - XGC Error Types
//!
//! Defines all error types used in XGC.
//!
//! # Error Categories
//!
//! ## Protocol Errors
//! - `BrokenExportIndex` - A repaired slot holds a different object
//! - `InvalidEdgeGraph` - Graph refers to slots the tables do not have
//!
//! ## Resource Errors
//! - `ResourceExhausted` - Work queue or table growth failed
//!
//! ## Usage Errors
//! - `InvalidHandle` - Object id is stale or of the wrong kind
//! - `Serialization` - Edge graph text could not be parsed
//! - `Configuration` - Invalid configuration
//!
//! A dead weak reference is never an error; lookups return `Option`.

use thiserror::Error;

/// Main error type for all XGC operations
///
/// # Examples
///
/// ```rust
/// use xgc::error::XgcError;
///
/// fn handle_error(err: XgcError) {
///     match err {
///         XgcError::BrokenExportIndex { index } => {
///             panic!("export slot {} was reused while still tracked", index);
///         }
///         err if err.is_recoverable() => {
///             eprintln!("retrying next cycle: {}", err);
///         }
///         _ => eprintln!("cycle rejected: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum XgcError {
    /// Export slot reused while a proxy still tracked it
    ///
    /// **When returned:** Repair finds slot `index` holding an object other
    /// than the one recorded at unlink time
    ///
    /// **Recovery strategy:** Cannot recover - handing out the slot would give
    /// the peer a wrong object
    #[error("broken export index: {index}")]
    BrokenExportIndex { index: usize },

    /// Edge graph is malformed or out of range for the receiving tables
    ///
    /// **When returned:** Before any table is mutated; the cycle is rejected
    ///
    /// **Recovery strategy:** Rebuild the graph on the next trigger
    #[error("invalid edge graph: {0}")]
    InvalidEdgeGraph(String),

    /// Edge graph text could not be encoded or decoded
    #[error("edge graph serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Resource exhausted
    ///
    /// **When returned:** Work queue or table growth could not allocate
    ///
    /// **Recovery strategy:** Tables are untouched; retry the cycle later
    #[error("Resource exhausted: {resource}")]
    ResourceExhausted { resource: String },

    /// Object id is stale, dead, or not of the expected kind
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    /// Configuration error
    ///
    /// **When returned:** `XgcConfig::validate` rejected the configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl XgcError {
    /// Check if retrying the cycle later can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            XgcError::ResourceExhausted { .. } | XgcError::InvalidEdgeGraph(_)
        )
    }

    /// Check if this error indicates a broken invariant
    pub fn is_bug(&self) -> bool {
        matches!(self, XgcError::BrokenExportIndex { .. })
    }

    pub(crate) fn exhausted(resource: impl Into<String>) -> Self {
        XgcError::ResourceExhausted {
            resource: resource.into(),
        }
    }
}

impl From<std::collections::TryReserveError> for XgcError {
    fn from(err: std::collections::TryReserveError) -> Self {
        XgcError::exhausted(err.to_string())
    }
}

impl From<crate::config::ConfigError> for XgcError {
    fn from(err: crate::config::ConfigError) -> Self {
        XgcError::Configuration(err.to_string())
    }
}

/// Result type alias for XGC operations
pub type Result<T> = std::result::Result<T, XgcError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
