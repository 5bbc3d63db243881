//! Bridge - two runtimes coupled in-process
//!
//! The bridge stands in for the call transport: every crossing exports on
//! the sending side, imports on the receiving side, and counts as one call
//! for the [`CycleScheduler`]. Scheduled work runs before the value
//! crosses, piggybacked on the call:
//!
//! ```text
//! send_to_remote(v, now)
//!   ├─ root v on the local heap for the duration of the scheduled work
//!   ├─ tick = scheduler.on_call(now)
//!   ├─ tick.piggyback  → scavenge both import tables, release on the peer
//!   ├─ tick.cycle_due  → local edge graph → remote CollectionManager
//!   └─ local.encode(v) → remote.decode(..)
//! ```
//!
//! The value in flight is the only Rust-held object treated as a root.
//! Root anything else that must survive a cycle with
//! [`Heap::add_root`](crate::heap::Heap::add_root) before the next call.

pub mod runtime;
pub mod scheduler;

pub use runtime::{Runtime, WireValue};
pub use scheduler::{CycleScheduler, Tick};

use crate::config::XgcConfig;
use crate::error::Result;
use crate::gc::{CrossHeapCollector, CycleReport};
use crate::object::Value;
use crate::remote::CollectionManager;
use crate::tables::{ExportIndex, ImportIndex};
use std::time::Instant;

/// Dead references released by one scavenge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    /// Remote export slots released for dead local proxies
    pub on_remote: usize,
    /// Local export slots released for dead remote proxies
    pub on_local: usize,
}

/// Bridge - local and remote runtime plus the collector driving them
pub struct Bridge {
    local: Runtime,
    remote: Runtime,
    scheduler: CycleScheduler,
    collector: CrossHeapCollector,
    manager: CollectionManager,
}

impl Bridge {
    pub fn new(config: XgcConfig) -> Result<Self> {
        let scheduler = CycleScheduler::new(&config);
        Ok(Self {
            local: Runtime::new("local"),
            remote: Runtime::new("remote"),
            scheduler,
            collector: CrossHeapCollector::new(config)?,
            manager: CollectionManager::new(),
        })
    }

    pub fn local(&self) -> &Runtime {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut Runtime {
        &mut self.local
    }

    pub fn remote(&self) -> &Runtime {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut Runtime {
        &mut self.remote
    }

    pub fn collector(&self) -> &CrossHeapCollector {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut CrossHeapCollector {
        &mut self.collector
    }

    pub fn manager(&self) -> &CollectionManager {
        &self.manager
    }

    pub fn scheduler(&self) -> &CycleScheduler {
        &self.scheduler
    }

    /// Pass `value` from the local side to the remote side
    pub fn send_to_remote(&mut self, value: Value, now: Instant) -> Result<Value> {
        let pinned = value.as_obj().map(|obj| self.local.heap_mut().add_root(obj));
        let scheduled = self.on_call(now);
        if let Some(handle) = pinned {
            self.local.heap_mut().remove_root(handle);
        }
        scheduled?;
        let wire = self.local.encode(value)?;
        self.remote.decode(wire)
    }

    /// Pass `value` from the remote side to the local side
    pub fn send_to_local(&mut self, value: Value, now: Instant) -> Result<Value> {
        let pinned = value.as_obj().map(|obj| self.remote.heap_mut().add_root(obj));
        let scheduled = self.on_call(now);
        if let Some(handle) = pinned {
            self.remote.heap_mut().remove_root(handle);
        }
        scheduled?;
        let wire = self.remote.encode(value)?;
        self.local.decode(wire)
    }

    /// Scheduled work; the caller keeps the value in flight rooted
    fn on_call(&mut self, now: Instant) -> Result<()> {
        let tick = self.scheduler.on_call(now);
        if tick.piggyback {
            self.scavenge_references();
        }
        if tick.cycle_due {
            match self.collect() {
                Ok(_) => self.scheduler.cycle_completed(now),
                Err(err) if err.is_bug() => return Err(err),
                // retried on the next call
                Err(err) => log::warn!("scheduled cycle failed: {}", err),
            }
        }
        Ok(())
    }

    /// Scavenge dead proxies on both sides and release their slots on the peer
    pub fn scavenge_references(&mut self) -> Released {
        let dead_local = self.local.scavenge_references();
        let on_remote = self.remote.release_exports(&across(&dead_local));
        let dead_remote = self.remote.scavenge_references();
        let on_local = self.local.release_exports(&across(&dead_remote));

        self.collector.record_released(self.remote.name(), on_remote);
        self.collector.record_released(self.local.name(), on_local);
        Released { on_remote, on_local }
    }

    /// Run one collection cycle now
    pub fn collect(&mut self) -> Result<CycleReport> {
        self.collector
            .collect(&self.local, &mut self.remote, &mut self.manager)
    }
}

fn across(indices: &[ImportIndex]) -> Vec<ExportIndex> {
    indices.iter().map(|j| j.across()).collect()
}
