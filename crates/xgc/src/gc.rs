//! Cross-Heap Collector - Cycle Orchestration
//!
//! One cycle is one synchronous round trip:
//!
//! ```text
//!   local side                         remote side
//!   ──────────                         ───────────
//!   build edge graph (exact|approx)
//!   serialize to JSON  ───────────▶    CollectionManager::collect
//!                                      (or collect_and_force_native_gc)
//!   report  ◀───────────────────────   ManagerReport
//! ```
//!
//! Nothing flows back except the report; the local side learns about
//! reclaimed objects when its import slots go dead.

use crate::bridge::Runtime;
use crate::config::{GraphMode, XgcConfig};
use crate::error::Result;
use crate::graph::{BuildOptions, EdgeGraph};
use crate::heap::CollectOutcome;
use crate::logging::{XgcEvent, XgcLogger, XgcLoggerConfig};
use crate::remote::CollectionManager;
use crate::stats::{CollectorStats, CycleTimer};
use std::time::Duration;

/// Outcome of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub mode: GraphMode,
    /// Top-level graph entries, `"root"` included
    pub graph_entries: usize,
    pub roots: usize,
    pub edges: usize,
    pub records: usize,
    pub unlinked: usize,
    pub repaired: usize,
    /// Remote export slots live after the cycle
    pub live_exports: usize,
    /// Remote export slots detached after the cycle
    pub detached_exports: usize,
    pub native: Option<CollectOutcome>,
    pub duration: Duration,
}

/// CrossHeapCollector - owns configuration, logger and statistics
pub struct CrossHeapCollector {
    config: XgcConfig,
    logger: XgcLogger,
    stats: CollectorStats,
    cycle: u64,
}

impl CrossHeapCollector {
    /// Create a collector; the configuration is validated
    pub fn new(config: XgcConfig) -> Result<Self> {
        let logger = if config.verbose {
            XgcLogger::new(XgcLoggerConfig::verbose())
        } else {
            XgcLogger::default()
        };
        Self::with_logger(config, logger)
    }

    pub fn with_logger(config: XgcConfig, logger: XgcLogger) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            logger,
            stats: CollectorStats::new(),
            cycle: 0,
        })
    }

    pub fn config(&self) -> &XgcConfig {
        &self.config
    }

    pub fn logger(&self) -> &XgcLogger {
        &self.logger
    }

    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// Drain the `(root_count, edge_count)` log, one pair per built graph
    pub fn take_size_log(&mut self) -> Vec<(usize, usize)> {
        self.stats.take_size_log()
    }

    /// Build the local edge graph with the configured builder
    pub fn build_graph(&self, local: &Runtime) -> Result<EdgeGraph> {
        local.build_edge_graph(self.config.graph_mode, &BuildOptions::from(&self.config))
    }

    /// Run one cycle from `local` into `remote`
    ///
    /// On error the remote tables are unchanged and the failure is logged;
    /// the next trigger retries.
    pub fn collect(
        &mut self,
        local: &Runtime,
        remote: &mut Runtime,
        manager: &mut CollectionManager,
    ) -> Result<CycleReport> {
        self.cycle += 1;
        let cycle = self.cycle;
        let timer = CycleTimer::new();
        self.logger.log(XgcEvent::CycleStart {
            cycle,
            mode: self.config.graph_mode.as_str().to_string(),
            reason: if self.config.force_native_gc {
                "forced native gc".to_string()
            } else {
                "scheduled".to_string()
            },
        });

        match self.run(cycle, local, remote, manager, timer) {
            Ok(report) => Ok(report),
            Err(err) => {
                self.stats.record_failure();
                self.logger.log(XgcEvent::CycleFailed {
                    cycle,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        cycle: u64,
        local: &Runtime,
        remote: &mut Runtime,
        manager: &mut CollectionManager,
        timer: CycleTimer,
    ) -> Result<CycleReport> {
        let graph = self.build_graph(local)?;
        self.stats.record_graph(graph.root_count(), graph.edge_count());
        self.logger.log(XgcEvent::GraphBuilt {
            cycle,
            entries: graph.len(),
            roots: graph.root_count(),
            edges: graph.edge_count(),
        });

        let json = graph.to_json()?;
        let outcome = if self.config.force_native_gc {
            manager.collect_and_force_native_gc(remote, &json)?
        } else {
            manager.collect(remote, &json)?
        };

        for (phase, duration) in &outcome.phases {
            self.logger.log(XgcEvent::PhaseEnd {
                cycle,
                phase: phase.to_string(),
                duration_ms: duration.as_secs_f64() * 1000.0,
            });
        }
        self.logger.log(XgcEvent::Unlinked {
            cycle,
            count: outcome.unlinked,
        });
        self.logger.log(XgcEvent::Repaired {
            cycle,
            count: outcome.repaired,
        });

        let duration = timer.elapsed();
        self.stats
            .record_cycle(outcome.unlinked, outcome.repaired, duration);

        let report = CycleReport {
            cycle,
            mode: self.config.graph_mode,
            graph_entries: graph.len(),
            roots: graph.root_count(),
            edges: graph.edge_count(),
            records: outcome.records,
            unlinked: outcome.unlinked,
            repaired: outcome.repaired,
            live_exports: remote.exports().live_count(),
            detached_exports: remote.exports().detached_indices().len(),
            native: outcome.native,
            duration,
        };
        self.logger.log(XgcEvent::CycleEnd {
            cycle,
            duration_ms: timer.elapsed_ms(),
            live_exports: report.live_exports,
            detached_exports: report.detached_exports,
        });
        Ok(report)
    }

    /// Record dead references released on `side`
    pub fn record_released(&mut self, side: &str, count: usize) {
        if count == 0 {
            return;
        }
        self.stats.record_released(count);
        self.logger.log(XgcEvent::ReferencesReleased {
            side: side.to_string(),
            count,
        });
    }
}
