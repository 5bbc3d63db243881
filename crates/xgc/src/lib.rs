//! # XGC - Cross-Heap Cycle Collector
//!
//! XGC lets two managed runtimes share objects by reference over a call
//! bridge while each keeps its own, oblivious garbage collector. A cycle
//! that runs through both heaps is invisible to either collector alone;
//! XGC finds such cycles and severs them without ever freeing an object
//! that is still reachable.
//!
//! ## Overview
//!
//! - **Reference tables**: each side exports local objects by slot and
//!   imports peer objects as weakly held proxies
//! - **Edge graph**: the local side summarizes which export slots keep
//!   which import slots alive, exactly or with 64-bit Bloom filters
//! - **Collection manager**: the remote side severs every export slot the
//!   graph does not keep alive, and repairs slots whose holders survive
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Instant;
//! use xgc::bridge::Bridge;
//! use xgc::object::Value;
//! use xgc::XgcConfig;
//!
//! fn main() -> Result<(), xgc::XgcError> {
//!     let mut bridge = Bridge::new(XgcConfig::default())?;
//!     let now = Instant::now();
//!
//!     // local object handed to the remote side, held there by a root
//!     let obj = bridge.local_mut().heap_mut().alloc_plain(vec![]);
//!     let proxy = bridge.send_to_remote(Value::Ref(obj), now)?;
//!     let holder = bridge.remote_mut().heap_mut().alloc_plain(vec![proxy]);
//!     bridge.remote_mut().heap_mut().add_root(holder);
//!
//!     // the remote side exports nothing yet, so nothing can be unlinked
//!     let report = bridge.collect()?;
//!     assert_eq!(report.unlinked, 0);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────── local side ────────────┐      ┌─────────── remote side ───────────┐
//! │ roots ─▶ objects ─▶ import proxies │      │ export table ─▶ objects           │
//! │            ▲                       │      │                   │               │
//! │ export table                       │      │ import proxies ◀──┘               │
//! │                                    │      │                                   │
//! │ marker ─▶ graph builder ─▶ JSON ───┼─────▶│ CollectionManager                 │
//! │                                    │      │  Repair/RootMark/Liveness/Unlink  │
//! └────────────────────────────────────┘      └───────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`bridge`]: runtimes, wire values, the in-process bridge and scheduler
//! - [`config`]: collector configuration and validation
//! - [`error`]: error types for all XGC operations
//! - [`gc`]: cycle orchestration
//! - [`graph`]: edge graph and its two builders
//! - [`heap`]: arena heap with a native mark-sweep collector
//! - [`logging`]: structured cycle events
//! - [`marker`]: reachability tracing, mark bitmaps, Bloom filters, work queue
//! - [`object`]: object model, weak references, proxies
//! - [`remote`]: the remote-side collection manager
//! - [`stats`]: cycle statistics and timers
//! - [`tables`]: export and import tables

// Core modules
pub mod config;
pub mod error;
pub mod gc;

// Object graph
pub mod heap;
pub mod marker;
pub mod object;

// Cross-heap protocol
pub mod bridge;
pub mod graph;
pub mod remote;
pub mod tables;

// Monitoring
pub mod logging;
pub mod stats;

// Re-export main types for convenience
pub use config::{GraphMode, XgcConfig};
pub use error::{Result, XgcError};
pub use gc::{CrossHeapCollector, CycleReport};
pub use graph::EdgeGraph;

/// XGC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_collector() {
        assert!(CrossHeapCollector::new(XgcConfig::default()).is_ok());
    }
}
